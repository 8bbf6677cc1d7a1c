pub mod models;
pub mod engine;
pub mod walk_forward_opt;
pub mod monte_carlo;
pub mod statistical;
pub mod data_quality;
pub mod stress;


pub use models::*;
pub use engine::{simulate_returns, BacktestEngine, Simulation};
pub use walk_forward_opt::WalkForwardOptimizer;
pub use monte_carlo::{bootstrap_resample, project_forward, MonteCarloValidator};
pub use data_quality::check_price_series;
pub use stress::{default_stress_periods, stress_test};
