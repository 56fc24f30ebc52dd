fn main() -> anyhow::Result<()> {
    statbench_cli::run()
}
