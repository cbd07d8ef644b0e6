use anyhow::Result;

use iris_bot::runner::bot_main;
use iris_cascade::CascadeBot;

fn main() -> Result<()> {
    bot_main("cascade-classifier", CascadeBot::new())
}
