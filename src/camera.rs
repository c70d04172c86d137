// src/camera.rs
// 固定机位的透视相机 + 场景旋转
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

// 与页面上的取景一致：相机在 +Z 轴上回望原点
const EYE_DISTANCE: f32 = 10.0;
const FOV_Y_DEGREES: f32 = 60.0;
const Z_NEAR: f32 = 0.1;
// 远平面要罩住星空外壳 (半径 45) 加上机位距离
const Z_FAR: f32 = 60.0;

// 将发送到 GPU 的相机 Uniform 数据结构。
// 视图与投影分开传，发光四边形要在视图空间里展开成面向相机的公告板。
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_model: [[f32; 4]; 4], // 视图 × 模型 (场景旋转)
    pub proj: [[f32; 4]; 4],       // 透视投影
    pub needs_srgb_output_conversion: u32, // 0 for false, 1 for true
    pub _padding: [u32; 3], // 填充到 16 字节边界
}

/// Fixed viewpoint looking at the origin; the only thing that changes per
/// frame is the scene's own rotation, supplied by the animator snapshot.
#[derive(Debug)]
pub struct SceneCamera {
    pub aspect_ratio: f32,
}

impl SceneCamera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        let aspect_ratio = viewport_width as f32 / viewport_height as f32;
        Self {
            aspect_ratio: if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
                aspect_ratio
            } else {
                1.0
            },
        }
    }

    /// 窗口大小改变时调用
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn build_proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            FOV_Y_DEGREES.to_radians(),
            self.aspect_ratio,
            Z_NEAR,
            Z_FAR,
        )
    }

    /// View × model for one frame. Rotation is applied as a model
    /// transform so positions in the snapshot stay in the structure's own
    /// coordinates.
    pub fn build_view_model_matrix(&self, yaw: f32, tilt: f32) -> Mat4 {
        let view_matrix = Mat4::look_at_rh(
            Vec3::new(0.0, 0.0, EYE_DISTANCE),
            Vec3::ZERO,
            Vec3::Y,
        );

        // 先绕 Y 自转，再加小幅俯仰
        let model_matrix = Mat4::from_rotation_x(tilt) * Mat4::from_rotation_y(yaw);

        view_matrix * model_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn degenerate_viewport_falls_back_to_square() {
        let camera = SceneCamera::new(0, 0);
        assert_eq!(camera.aspect_ratio, 1.0);
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let camera = SceneCamera::new(1920, 1080);
        let frame = camera.build_proj_matrix() * camera.build_view_model_matrix(0.3, -0.1);
        let clip = frame * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
    }

    #[test]
    fn yaw_rotates_about_y_axis() {
        let camera = SceneCamera::new(100, 100);
        let half_turn = camera.build_view_model_matrix(std::f32::consts::PI, 0.0);
        let identity = camera.build_view_model_matrix(0.0, 0.0);

        let rotated = half_turn * Vec4::new(1.0, 0.0, 0.0, 1.0);
        let straight = identity * Vec4::new(-1.0, 0.0, 0.0, 1.0);
        assert!((rotated.x - straight.x).abs() < 1e-4);
        assert!((rotated.z - straight.z).abs() < 1e-4);
    }
}
