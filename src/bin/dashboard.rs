use clap::Parser;
use log::{error, info};

use ohlcv_lab::{
    cli::Args,
    models::ResearchParams,
    pipeline::{self, PipelineOutput},
};

async fn run(args: &Args) -> Result<(), anyhow::Error> {
    let source = args.source()?;
    info!("Loading bars from {}", source.describe());
    let raw = source.load().await?;

    let PipelineOutput { frame, summary } = pipeline::run(&raw, &args.parameter_set())?;
    let frame = if args.research {
        pipeline::research(&frame, &ResearchParams::default())?
    } else {
        frame
    };

    println!("{}", frame.tail(args.rows));
    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        error!("Dashboard run failed: {}", e);
        return Err(e);
    }
    Ok(())
}
