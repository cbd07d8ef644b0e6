use anyhow::Result;

use iris_bot::runner::bot_main;
use iris_motion::MotionBot;

fn main() -> Result<()> {
    bot_main("motion-detector", MotionBot::new())
}
