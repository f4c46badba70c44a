//! Provider selection

use clap::{Args, ValueEnum};
use resourceflow_cloudflare::{CloudflareDns, DnsConfig, DnsRecordTranslator};
use resourceflow_core::{EngineConfig, Orchestrator};
use resourceflow_sakura::{ServerTranslator, Usacloud};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// さくらのクラウド サーバー (usacloud)
    Sakura,
    /// Cloudflare DNS レコード
    Cloudflare,
}

#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// プロバイダー
    #[arg(short, long, value_enum, env = "RESOURCEFLOW_PROVIDER")]
    pub provider: Provider,

    /// さくらのクラウドのゾーン
    #[arg(long, env = "SAKURACLOUD_ZONE", default_value = resourceflow_sakura::DEFAULT_ZONE)]
    pub zone: String,
}

pub type SakuraOrchestrator = Orchestrator<ServerTranslator, Usacloud>;
pub type CloudflareOrchestrator = Orchestrator<DnsRecordTranslator, CloudflareDns>;

pub fn sakura(args: &ProviderArgs, config: EngineConfig) -> SakuraOrchestrator {
    Orchestrator::new(ServerTranslator::default(), Usacloud::new(&args.zone), config)
}

/// Credentials come from CLOUDFLARE_API_TOKEN / CLOUDFLARE_ZONE_ID
pub fn cloudflare(config: EngineConfig) -> anyhow::Result<CloudflareOrchestrator> {
    let dns = CloudflareDns::new(DnsConfig::from_env()?);
    Ok(Orchestrator::new(DnsRecordTranslator::default(), dns, config))
}

/// Runs `$body` with `$orchestrator` bound to the selected provider's orchestrator
macro_rules! with_orchestrator {
    ($args:expr, $config:expr, |$orchestrator:ident| $body:expr) => {
        match $args.provider {
            $crate::providers::Provider::Sakura => {
                let $orchestrator = $crate::providers::sakura(&$args, $config);
                $body
            }
            $crate::providers::Provider::Cloudflare => {
                let $orchestrator = $crate::providers::cloudflare($config)?;
                $body
            }
        }
    };
}

pub(crate) use with_orchestrator;
