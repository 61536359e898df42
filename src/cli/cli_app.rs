use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use serde_json::{json, Value};

use super::batch_file::parse_batch;
use crate::config::ClientConfig;
use crate::jsonrpc::engine::encode;
use crate::jsonrpc::{Call, CallId, Client, HttpTransport, ResponseFuture, Transport};
use crate::logging::Logger;

/// jrpc - JSON-RPC 2.0 over HTTP from the command line
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Endpoint URI every request is POSTed to
    #[arg(short, long)]
    pub endpoint: String,

    /// Request timeout in milliseconds (0 disables it)
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Override the User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Call a method and print its result
    Call {
        method: String,

        /// Parameters as JSON
        #[arg(short, long)]
        params: Option<String>,

        /// Request id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Send a notification
    Notify {
        method: String,

        /// Parameters as JSON
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Send every call listed in a JSON file ("-" reads stdin)
    Batch { file: PathBuf },
}

impl Cli {
    pub fn config(&self) -> ClientConfig {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        let config = ClientConfig::new(self.endpoint.clone()).with_timeout(timeout);
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent.clone()),
            None => config,
        }
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_params(params: Option<&str>) -> Result<Option<Value>> {
    params
        .map(|raw| serde_json::from_str(raw).with_context(|| format!("Invalid JSON params: {}", raw)))
        .transpose()
}

/// Numeric ids stay numbers on the wire
fn parse_id(id: Option<String>) -> Option<CallId> {
    id.map(|raw| match raw.parse::<i64>() {
        Ok(n) => CallId::Number(n),
        Err(_) => CallId::String(raw),
    })
}

fn read_batch_file(file: &PathBuf) -> Result<String> {
    // "-" は標準入力から読み込む
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read batch from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))
}

/// Render the outcome of one call as a single JSON line; `false` on error
async fn report(future: ResponseFuture) -> bool {
    let id = future.id().clone();
    // 1呼び出しにつき1行のJSONを出力
    match future.await {
        Ok(success) => {
            println!("{}", json!({"id": id, "result": success.result}));
            true
        }
        Err(failure) => {
            println!("{}", json!({"id": id, "error": failure.error}));
            false
        }
    }
}

/// Post calls that expect no answer and wait until the POST is done
async fn deliver(transport: &dyn Transport, calls: &[Call]) -> Result<()> {
    let body = encode(calls)?;
    transport
        .send(body)
        .await
        .context("Error in http request")?;
    Ok(())
}

/// CLI実行エントリーポイント（失敗した呼び出しがあれば `false`）
pub async fn run_cli() -> Result<bool> {
    let cli = Cli::parse();

    // -v の数に応じてログレベルを決定
    let _ = env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .try_init();

    let config = cli.config();
    let endpoint = config.endpoint_url()?;
    // トランスポートとクライアントには同じロガーを渡す
    let transport = Arc::new(
        HttpTransport::new(endpoint.clone(), config.timeout(), config.user_agent.clone())?
            .with_logger(Logger::global()),
    );
    let client = Client::with_transport(endpoint, transport.clone()).with_logger(Logger::global());

    debug!("Command: {:?}", cli.command);

    match cli.command {
        Command::Call { method, params, id } => {
            let params = parse_params(params.as_deref())?;
            let future = client.method(method, params, parse_id(id))?;
            Ok(report(future).await)
        }
        Command::Notify { method, params } => {
            // 通知は応答が無いので、POSTの完了だけを待つ
            let params = parse_params(params.as_deref())?;
            let call = Call::notification(method, params)?;
            deliver(transport.as_ref(), &[call]).await?;
            Ok(true)
        }
        Command::Batch { file } => {
            let calls = parse_batch(&read_batch_file(&file)?)?;
            // 通知のみのバッチはそのまま送信
            if !calls.iter().any(Call::needs_response) {
                deliver(transport.as_ref(), &calls).await?;
                return Ok(true);
            }

            let mut batch = client.batch_request();
            let mut futures = Vec::new();
            for call in calls {
                futures.extend(batch.push(call)?);
            }
            let Some(all) = batch.send(None)? else {
                return Ok(true);
            };

            // 結果はファイルに書かれた順に出力
            let mut ok = true;
            for future in futures {
                ok &= report(future).await;
            }
            if let Ok(replies) = all.await {
                info!("{} replies received", replies.len());
            }
            Ok(ok)
        }
    }
}
