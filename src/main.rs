fn main() -> anyhow::Result<()> {
    sealroute::cli::run_cli()
}
