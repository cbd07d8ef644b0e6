use anyhow::Result;

use iris_bot::runner::bot_main;
use iris_probe::ProbeBot;

fn main() -> Result<()> {
    bot_main("probe", ProbeBot)
}
