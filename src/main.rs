use std::sync::Arc;

use transbank_webpay::{
    RpcParam, SignedSoapClient, WEBPAY_TRANSACTION, config::Config, telemetry,
    transport::HttpTransport,
};

/// Invoke a Webpay method from the command line:
///
///   transbank-webpay getTransactionStatus tokenInput=e9d5...
///
/// Credentials and environment come from config/settings.* or APP_-prefixed
/// environment variables.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init_tracing();

    let config = Config::load()?;
    tracing::info!("Loaded configuration: {:?}", config);

    let credentials = config
        .credentials
        .as_ref()
        .ok_or_else(|| color_eyre::eyre::eyre!("no [credentials] section configured"))?;
    let environment = config.service.environment()?;
    let bag = Arc::new(credentials.load_bag(environment)?);

    let transport = HttpTransport::with_timeout(config.service.timeout());
    let mut client = SignedSoapClient::with_transport(
        bag,
        &WEBPAY_TRANSACTION,
        config.service.endpoint.as_deref(),
        Box::new(transport),
    )?;
    tracing::info!(endpoint = client.endpoint(), "webpay client ready");

    let mut args = std::env::args().skip(1);
    let Some(method) = args.next() else {
        eprintln!("usage: transbank-webpay <method> [name=value]...");
        return Ok(());
    };

    let params: Vec<RpcParam> = args
        .map(|arg| match arg.split_once('=') {
            Some((name, value)) => RpcParam::new(name, value),
            None => RpcParam::new("tokenInput", arg),
        })
        .collect();

    let response = client.invoke(&method, &params).await?;
    println!("{}", response.body());
    Ok(())
}
