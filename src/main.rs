fn main() -> anyhow::Result<()> {
    carewatch_lib::run()
}
