use anstyle::{AnsiColor, Style};
use c2cads::{
    AdForm, C2cRestAPI, Credentials, DisclaimerGate, FilterField, FormState, ProxyConfig, TradeMethodTagging,
    disclaimer::{DEFAULT_WAIT_SECS, DISCLAIMER},
    proxy,
};
use clap::{Args, Parser, Subcommand};
use displaydoc::Display;
use env_logger::{Builder, Env};
use log::Level;
use serde::Serialize;
use std::{io::Write, net::SocketAddr, process::exit, sync::Arc, time::Duration};

/// Structure representing parsed command-line arguments to "c2cads" executable
#[derive(Parser)]
#[command(version, about)]
struct C2cAdsConfig {
    #[command(subcommand)]
    command: Command,

    /// Base url of the exchange REST API
    #[arg(long, env = "C2C_BASE_URL", default_value = c2cads::BINANCE_BASE_URL)]
    base_url: String,

    /// Timeout for each call to the exchange, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

/// Credentials for one session. Prefer the environment over the command line.
#[derive(Args)]
struct CredentialArgs {
    /// Binance api key
    #[arg(long, env = "C2C_API_KEY", hide_env_values = true)]
    api_key: String,
    /// Binance secret key
    #[arg(long, env = "C2C_SECRET_KEY", hide_env_values = true)]
    secret_key: String,
}

impl From<CredentialArgs> for Credentials {
    fn from(src: CredentialArgs) -> Self {
        Credentials::new(src.api_key, src.secret_key)
    }
}

/// Buyer eligibility filters. Omitted filters stay unrestricted.
#[derive(Args)]
struct FilterArgs {
    /// Minimum total trade count
    #[arg(long)]
    all_trade_count_min: Option<String>,
    /// Maximum total trade count
    #[arg(long)]
    all_trade_count_max: Option<String>,
    /// Minimum buy trade count
    #[arg(long)]
    buy_trade_count_min: Option<String>,
    /// Maximum buy trade count
    #[arg(long)]
    buy_trade_count_max: Option<String>,
    /// Minimum sell trade count
    #[arg(long)]
    sell_trade_count_min: Option<String>,
    /// Maximum sell trade count
    #[arg(long)]
    sell_trade_count_max: Option<String>,
    /// Minimum number of completed trades
    #[arg(long)]
    trade_complete_count_min: Option<String>,
    /// Minimum completion rate, in percent
    #[arg(long)]
    trade_complete_rate_min: Option<String>,
    /// Period for the completion rate (1 = last 30 days, 2 = all time)
    #[arg(long)]
    trade_complete_rate_filter_time: Option<String>,
    /// Period for trade counts (1 = last 30 days, 2 = all time)
    #[arg(long)]
    trade_count_filter_time: Option<String>,
}

impl FilterArgs {
    fn into_inputs(self) -> Vec<(FilterField, String)> {
        [
            (FilterField::AllTradeCountMin, self.all_trade_count_min),
            (FilterField::AllTradeCountMax, self.all_trade_count_max),
            (FilterField::BuyTradeCountMin, self.buy_trade_count_min),
            (FilterField::BuyTradeCountMax, self.buy_trade_count_max),
            (FilterField::SellTradeCountMin, self.sell_trade_count_min),
            (FilterField::SellTradeCountMax, self.sell_trade_count_max),
            (FilterField::TradeCompleteCountMin, self.trade_complete_count_min),
            (FilterField::TradeCompleteRateMin, self.trade_complete_rate_min),
            (FilterField::TradeCompleteRateFilterTime, self.trade_complete_rate_filter_time),
            (FilterField::TradeCountFilterTime, self.trade_count_filter_time),
        ]
        .into_iter()
        .filter_map(|(field, input)| input.map(|input| (field, input)))
        .collect()
    }
}

/// Commands supported by c2cads executable
#[derive(Subcommand, Display)]
enum Command {
    /// Serve the proxy endpoints on {bind}
    Serve {
        /// Address to listen on
        #[arg(long, env = "C2C_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// List the payment methods of ad {ad_id}
    Methods {
        /// Number of one of your existing ads
        ad_id: String,
        #[command(flatten)]
        creds: CredentialArgs,
    },
    /// Create an ad with payment methods taken from ad {ad_id}
    Create {
        /// Number of one of your existing ads
        ad_id: String,
        /// Pay id of the payment method to use. Optional if the ad has only one.
        #[arg(long)]
        pay_id: Option<String>,
        /// Tag the payment method with its own type instead of BANK_TRANSFER
        #[arg(long)]
        carry_pay_type: bool,
        /// Accept the disclaimer without prompting (the countdown still runs)
        #[arg(long)]
        yes: bool,
        #[command(flatten)]
        creds: CredentialArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

/// Logs a "pretty printed" json structure
fn log_value<T: Serialize + std::fmt::Debug>(val: &T) {
    match serde_json::to_string_pretty(val) {
        Ok(pretty) => {
            log::info!("{}", pretty);
        }
        Err(err) => {
            log::error!("Could not pretty-print structure: {:?}: {}", val, err);
        }
    }
}

fn fail(message: &str) -> ! {
    log::error!("{}", message);
    exit(1)
}

async fn acknowledge_disclaimer(yes: bool) -> DisclaimerGate {
    eprintln!("{}\n", DISCLAIMER);
    let mut gate = DisclaimerGate::new(DEFAULT_WAIT_SECS);
    gate.count_down(Duration::from_secs(1), |remaining| {
        if remaining > 0 {
            log::info!("Please wait {} second(s) before you can proceed...", remaining);
        }
    })
    .await;

    if !yes {
        eprint!("Type 'yes' to acknowledge and continue: ");
        std::io::stderr().flush().expect("could not flush stderr");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).expect("could not read stdin");
        if line.trim() != "yes" {
            fail("Disclaimer not acknowledged");
        }
    }
    gate.acknowledge().expect("countdown has finished");
    gate
}

/// Walk the form through fetching methods, selecting one, and submitting
async fn create(
    api: &C2cRestAPI,
    gate: &DisclaimerGate,
    tagging: TradeMethodTagging,
    creds: Credentials,
    ad_id: String,
    pay_id: Option<String>,
    filters: FilterArgs,
) {
    let mut form = AdForm::new(gate, tagging).expect("disclaimer acknowledged");
    form.enter_credentials(creds).expect("form accepts credentials");
    form.set_ad_id(ad_id).expect("form accepts ad id");

    let request = form.begin_fetch().unwrap_or_else(|err| fail(&err.to_string()));
    let result = proxy::fetch_ad_details(api, request).await;
    form.finish_fetch(result).expect("form was fetching");
    log::info!("{}", form.message());
    if form.state() != FormState::MethodsFetched {
        exit(1);
    }

    for method in form.methods() {
        log::info!("  {} (ID: {})", method.display_name(), method.pay_id);
    }
    let pay_id = match (pay_id, form.methods()) {
        (Some(pay_id), _) => pay_id,
        (None, [only]) => only.pay_id.clone(),
        (None, _) => fail("This ad has several payment methods, choose one with --pay-id"),
    };
    form.select_method(&pay_id).unwrap_or_else(|err| fail(&err.to_string()));

    for (field, input) in filters.into_inputs() {
        form.set_filter(field, &input).expect("method is selected");
    }

    log::info!("Fixed ad settings:");
    log_value(form.defaults());
    let restrictions = form.filters().active_restrictions();
    if restrictions.is_empty() {
        log::info!("No buyer restrictions set");
    }
    for line in restrictions {
        log::info!("Buyer filter: {}", line);
    }

    let request = form.begin_submit().unwrap_or_else(|err| fail(&err.to_string()));
    let result = proxy::create_ad(api, request).await;
    let response = result.clone().ok();
    form.finish_submit(result).expect("form was submitting");
    log::info!("{}", form.message());
    match response {
        Some(response) if form.state() == FormState::Created => {
            log_value(&response);
            log::info!("Edit the ad's price and amounts on Binance, then delete this API key.");
        }
        _ => exit(1),
    }
}

#[tokio::main]
async fn main() {
    // Default to INFO log level for everything if we do not have an explicit
    // setting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let color = match record.level() {
                Level::Error => AnsiColor::Red,
                Level::Warn => AnsiColor::Yellow,
                Level::Info => AnsiColor::Green,
                Level::Debug => AnsiColor::Cyan,
                Level::Trace => AnsiColor::Magenta,
            };
            let style = Style::new().fg_color(Some(color.into())).bold();

            writeln!(
                buf,
                "{} {style}{}{style:#} [{} {}:{}] {}",
                chrono::Utc::now(),
                record.level(),
                record.module_path().unwrap_or("?"),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .init();

    let config = C2cAdsConfig::parse();
    log::debug!("{}", config.command);

    let mut builder = ProxyConfig::builder()
        .base_url(config.base_url)
        .timeout(Duration::from_secs(config.timeout_secs));
    if let Command::Serve { bind } = &config.command {
        builder = builder.bind(*bind);
    }
    if let Command::Create { carry_pay_type: true, .. } = &config.command {
        builder = builder.tagging(TradeMethodTagging::Selected);
    }
    let proxy_config = builder.build().expect("error building config");

    let api = C2cRestAPI::new(&proxy_config).expect("could not create exchange api");

    match config.command {
        Command::Serve { .. } => {
            let listener = tokio::net::TcpListener::bind(proxy_config.bind())
                .await
                .expect("could not bind listener");
            log::info!("Proxy listening on http://{}", proxy_config.bind());
            axum::serve(listener, proxy::router(Arc::new(api)))
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    log::info!("Shutting down");
                })
                .await
                .expect("server error");
        }
        Command::Methods { ad_id, creds } => {
            let request = proxy::AdDetailsRequest::new(&creds.into(), ad_id);
            match proxy::fetch_ad_details(&api, request).await {
                Ok(details) => match c2cads::form::payment_methods(&details) {
                    Some(methods) => {
                        log::info!("Found {} payment method(s)", methods.len());
                        log_value(&methods);
                    }
                    None => log::warn!("No payment methods found for this ad"),
                },
                Err(err) => fail(&format!("Error: {}", err)),
            }
        }
        Command::Create {
            ad_id,
            pay_id,
            yes,
            creds,
            filters,
            ..
        } => {
            let gate = acknowledge_disclaimer(yes).await;
            create(&api, &gate, proxy_config.tagging(), creds.into(), ad_id, pay_id, filters).await;
        }
    }
}
