use crate::settings::Settings;
use clap::Args;

/// Command-line overrides layered on top of the loaded `Settings`.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Capture the message stream during the scenario and check event counts.
    #[arg(long, global = true)]
    pub with_mq: bool,

    /// Reload the exchange state after the trade and assert it again.
    #[arg(long, global = true)]
    pub verify_reload: bool,

    /// Fixed RNG seed for the bot.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Exchange gateway URL.
    #[arg(long, global = true)]
    pub exchange_url: Option<String>,
}

impl Overrides {
    /// Flags only ever switch features on; they never turn off what the file enabled.
    pub fn apply(&self, settings: &mut Settings) {
        if self.with_mq {
            settings.scenario.with_mq = true;
        }
        if self.verify_reload {
            settings.scenario.verify_reload = true;
        }
        if self.seed.is_some() {
            settings.bot.seed = self.seed;
        }
        if let Some(url) = &self.exchange_url {
            settings.exchange.base_url = url.clone();
        }
    }
}
