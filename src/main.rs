fn main() -> anyhow::Result<()> {
    material_script::run()
}
