fn main() -> anyhow::Result<()> {
    hestia_driver::main()
}
