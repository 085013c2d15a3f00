fn main() -> color_eyre::Result<()> {
    pgmon::run_cli()
}
