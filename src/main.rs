fn main() -> anyhow::Result<()> {
    synapview::run()
}
