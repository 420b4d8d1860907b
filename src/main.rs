fn main() -> anyhow::Result<()> {
    nostrchat_panel_lib::run()
}
