use std::{sync::Arc, sync::Mutex};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use once_cell::sync::OnceCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;

mod animator;
mod app_state;
mod camera;
mod color;
mod config;
mod models;
mod rng;
mod scene;
mod ui_events;

pub use config::NetworkConfig;

use app_state::State;
use ui_events::UserCommand;

#[cfg(target_arch = "wasm32")]
static WASM_API_INSTANCE: OnceCell<WasmApi> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
static WASM_READY_FLUME_CHANNEL: OnceCell<(flume::Sender<()>, flume::Receiver<()>)> = OnceCell::new();


struct App {
    window: Option<Arc<Window>>,
    state: Arc<Mutex<Option<State>>>, // Wrapped in Arc<Mutex> for interior mutability and potential Send (if State itself were Send)
    network_config: NetworkConfig,
    #[cfg(target_arch = "wasm32")]
    proxy: Option<EventLoopProxy<UserCommand>>,
}

impl App {
    fn new(
        network_config: NetworkConfig,
        #[cfg(target_arch = "wasm32")] event_loop: &EventLoop<UserCommand>,
    ) -> Self {
        #[cfg(target_arch = "wasm32")]
        let app_proxy = event_loop.create_proxy();

        #[cfg(target_arch = "wasm32")]
        {
            let wasm_api_instance = WasmApi { proxy: app_proxy.clone() };
            if WASM_API_INSTANCE.set(wasm_api_instance).is_err() {
                log::warn!("WASM_API_INSTANCE was already set. This should only happen once.");
            }
        }

        Self {
            window: None,
            state: Arc::new(Mutex::new(None)),
            network_config,
            #[cfg(target_arch = "wasm32")]
            proxy: Some(app_proxy),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn get_window_size(&self) -> Option<winit::dpi::PhysicalSize<u32>> {
        self.window.as_ref().map(|w| w.inner_size())
    }
}

impl ApplicationHandler<UserCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let mut window_attributes = Window::default_attributes()
            .with_title("SynapView Network Background");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                // 纯装饰背景：没有窗口就什么都不画，不让宿主崩掉
                log::error!("No window available, running without the background: {e}");
                return;
            }
        };
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(State::new(window, self.network_config.clone())) {
                Ok(mut state) => {
                    let current_size = self.get_window_size().unwrap();
                    state.resize(current_size.width, current_size.height);
                    self.state.lock().unwrap().replace(state); // Set state within the Mutex
                    // Request redraw using App's window handle
                    self.window.as_ref().unwrap().request_redraw();
                }
                Err(e) => {
                    // Decorative only: degrade to an empty window, never crash
                    log::error!("GPU init failed, background disabled: {e:#}");
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            // Clone Arc<Mutex<Option<State>>> and Arc<Window> for the async task
            let state_arc_for_spawn = self.state.clone();
            let window_for_state_new = window.clone(); // Pass clone to State::new
            let proxy_for_init_notification = self.proxy.as_ref().expect("App proxy not set").clone();
            let network_config = self.network_config.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone(), network_config).await {
                    Ok(mut state_instance) => {
                        log::info!("WASM State created in async task.");
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(initial_size.width, initial_size.height);

                        {
                            let mut app_state_guard = state_arc_for_spawn.lock().unwrap();
                            app_state_guard.replace(state_instance);
                        }
                        log::info!("WASM State assigned to App. Sending initialization notification.");
                        if proxy_for_init_notification.send_event(UserCommand::StateInitialized).is_err() {
                            log::error!("Failed to send StateInitialized event.");
                        }
                    },
                    // Degrade silently: the page keeps working without the decoration
                    Err(e) => log::error!("GPU init failed, background disabled: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserCommand) {
        match event {
            UserCommand::StateInitialized => {
                log::info!("WASM State initialized and ready.");
                // Signal to the promise resolver
                #[cfg(target_arch = "wasm32")]
                if let Some((sender, _)) = WASM_READY_FLUME_CHANNEL.get() {
                    if let Err(e) = sender.send(()) {
                        log::error!("Failed to send WASM ready signal: {:?}", e);
                    }
                }
                if let Some(w_handle) = self.window.as_ref() {
                    w_handle.request_redraw();
                }
            }
            _ => {
                if let Some(state) = &mut *self.state.lock().unwrap() {
                    state.process_command(event);
                } else {
                    log::warn!("Received a command before state was initialized (via proxy). Ignoring: {:?}", event);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut *self.state.lock().unwrap() else {
            // GPU 不可用时的降级路径：只响应关闭
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
            }
            return;
        };

        let window_handle = self.window.as_ref().unwrap();

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.resize(size.width, size.height);
                window_handle.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => state.resize(state.config.width, state.config.height),
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::error!("{:?}", e),
                }
                // 连续动画：每帧结束后立刻排下一帧
                window_handle.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                // 归一化到 [-1,1]²，Y 轴向上。只更新采样值，场景不被直接操纵。
                let width = state.config.width.max(1) as f32;
                let height = state.config.height.max(1) as f32;
                state.process_command(UserCommand::SetPointerOffset {
                    x: (position.x as f32 / width) * 2.0 - 1.0,
                    y: 1.0 - (position.y as f32 / height) * 2.0,
                });
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).unwrap_throw();
            log::info!("Starting SynapView background.");
            let (sender, receiver) = flume::unbounded();
            WASM_READY_FLUME_CHANNEL.set((sender, receiver))
                .expect("Failed to initialize WASM_READY_CHANNEL. This should not happen.");
            log::info!("WASM ready channel created and stored.");

            let network_config = NetworkConfig::default();
        } else {
            env_logger::init();

            // 可选的 JSON 配置文件路径；省略时使用内置参数
            let network_config = match std::env::args().nth(1) {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("reading config {path:?}: {e}"))?;
                    serde_json::from_str(&text)
                        .map_err(|e| anyhow::anyhow!("parsing config {path:?}: {e}"))?
                }
                None => NetworkConfig::default(),
            };
        }
    }

    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        network_config,
        #[cfg(target_arch = "wasm32")]
        &event_loop,
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    log::info!("WASM started: Calling run().");
    run().unwrap_throw();

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmApi {
    proxy: EventLoopProxy<UserCommand>,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmApi {
    /// The host page forwards its own mousemove samples here; the canvas
    /// sits behind the content with `pointer-events: none` and never sees
    /// them itself.
    #[wasm_bindgen(js_name = setPointerOffset)]
    pub fn set_pointer_offset(&self, x: f32, y: f32) -> Result<(), JsValue> {
        if self.proxy.send_event(UserCommand::SetPointerOffset { x, y }).is_err() {
            return Err(JsValue::from_str("Failed to send command to event loop."));
        }
        Ok(())
    }

    /// Replaces generation parameters with a JSON override and rebuilds
    /// the topology. Missing fields keep their defaults.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&self, config_json: &str) -> Result<(), JsValue> {
        let parsed_config: NetworkConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("JSON parsing error: {}", e)))?;

        log::info!("Received SetConfig command from JS.");

        if self.proxy.send_event(UserCommand::SetConfig(parsed_config)).is_err() {
            return Err(JsValue::from_str("Failed to send command to event loop."));
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = regenerate)]
    pub fn regenerate(&self, seed: u32) -> Result<(), JsValue> {
        if self.proxy.send_event(UserCommand::Regenerate { seed }).is_err() {
            return Err(JsValue::from_str("Failed to send command to event loop."));
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmApi)]
pub fn get_wasm_api() -> Result<WasmApi, JsValue> {
    WASM_API_INSTANCE.get()
        .cloned()
        .ok_or_else(|| JsValue::from_str("WasmApi is not initialized. Call run_web() first."))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmReadyPromise)]
pub fn get_wasm_ready_promise() -> Result<Promise, JsValue> {
    let (_, receiver) = WASM_READY_FLUME_CHANNEL.get()
        .ok_or_else(|| JsValue::from_str("WASM ready channel already taken or not initialized. Make sure getWasmApi() is called only once."))?;

    // Convert the Rust Future obtained from the flume receiver into a js_sys::Promise
    let ready_promise = future_to_promise(async move {
        receiver.recv_async().await.unwrap_throw(); // Wait for the signal
        Ok(JsValue::NULL) // Resolve with null
    });

    // 将 Rust Future 转换为 JS Promise
    Ok(ready_promise)
}
