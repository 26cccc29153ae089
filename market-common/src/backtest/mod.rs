pub mod engine;
pub mod indicators;
pub mod odds;
pub mod regime;

pub use engine::{BiasBacktestConfig, BiasBacktester, BiasRegimeEvent, PeakSource};
pub use indicators::{
    augment_with_bias, project_moving_average, simple_moving_average, BiasBar,
    MovingAverageProjection,
};
pub use odds::{bias_odds, BiasOdds};
pub use regime::{Regime, RegimeClassifier, RegimeError, RegimeReading};
