//! Portfolio risk analysis example
//!
//! Generates the four-asset demo market, loads the sample engine
//! configuration and prints a full risk report.
//!
//! Run with: cargo run --example analyze_portfolio
//! Set RUST_LOG=debug to see per-batch simulation logs.

use copula_risk::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Copula Portfolio Risk Analysis ===\n");

    // 1. Synthetic market: one year of daily prices for four assets
    let data = SyntheticMarket::demo()?.generate(&mut StdRng::seed_from_u64(2023))?;
    println!(
        "Generated {} days of prices for {:?}",
        data.dates.len(),
        data.returns.assets()
    );
    println!();

    // 2. Engine configuration
    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/engine.yaml");
    let yaml = std::fs::read_to_string(config_path)?;
    let engine = RiskEngine::from_yaml(&yaml)?;

    // 3. Student-t dependence, 99% confidence over 10 days
    let request = RiskRequest {
        confidence: 99.0,
        time_horizon_days: 10,
        ..RiskRequest::new(data.returns, vec![0.4, 0.3, 0.2, 0.1], CopulaModel::student_t())
    };
    let report = engine.analyze(&request)?;

    println!("Correlation matrix:");
    for (asset, row) in report.correlation.assets().iter().zip(report.correlation.to_rows()) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:6.3}", v)).collect();
        println!("  {:<12} {}", asset, cells.join(" "));
    }
    println!();

    print_metrics("Historical (1 day)", &report.historical);
    print_metrics("Simulated (10 day)", &report.simulated);

    println!("Diagnostics:");
    let diagnostics = &report.diagnostics;
    println!("  KS goodness of fit: {:.4}", diagnostics.goodness_of_fit);
    if let (Some(upper), Some(lower), Some(tau)) = (
        diagnostics.upper_tail_dependence,
        diagnostics.lower_tail_dependence,
        diagnostics.kendalls_tau,
    ) {
        println!("  Upper tail dependence: {:.4}", upper);
        println!("  Lower tail dependence: {:.4}", lower);
        println!("  Kendall's tau: {:.4}", tau);
    }
    println!();

    println!("Stress scenarios:");
    for result in &report.stress.results {
        println!(
            "  {:<18} x{:.1} -> VaR {:.2}%",
            result.scenario_name,
            result.var_multiplier,
            result.stressed_var * 100.0
        );
    }
    println!("  Worst: {}", report.stress.worst_scenario);
    println!();

    if report.has_warnings() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("=== Analysis Complete ===");
    Ok(())
}

fn print_metrics(label: &str, metrics: &RiskMetrics) {
    println!("{}:", label);
    println!("  VaR:          {:.2}%", metrics.var * 100.0);
    println!("  CVaR:         {:.2}%", metrics.cvar * 100.0);
    println!("  Volatility:   {:.2}%", metrics.volatility * 100.0);
    println!("  Max drawdown: {:.2}%", metrics.max_drawdown * 100.0);
    println!("  Sharpe ratio: {:.3}", metrics.sharpe_ratio);
    println!();
}
