//! Simple moving average crossover strategy
//!
//! Emits BUY when the price crosses above the moving average of the last
//! N prices, SELL when it crosses below. State lives in a bounded sliding
//! window plus the last known position relative to the average.

use super::types::{Position, Signal, SignalType, StrategyError};
use crate::feed::Tick;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::VecDeque;

/// Fractional digits kept when rounding the moving average
const SMA_SCALE: u32 = 10;

/// SMA crossover strategy state for one symbol
pub struct SmaCrossover {
    name: String,
    window_size: usize,
    window: VecDeque<Decimal>,
    position: Position,
}

impl SmaCrossover {
    /// Create a strategy with the given window size
    ///
    /// A zero window is a configuration error, not a runtime condition.
    pub fn new(window_size: usize) -> Result<Self, StrategyError> {
        if window_size == 0 {
            return Err(StrategyError::InvalidWindow(window_size));
        }
        Ok(Self {
            name: format!("SMA-{}", window_size),
            window_size,
            window: VecDeque::with_capacity(window_size + 1),
            position: Position::Unknown,
        })
    }

    /// Human-readable strategy name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process one tick, strictly in arrival order
    ///
    /// Pushes the price into the window (evicting the oldest entry once the
    /// window is full), recomputes the average, and reports a signal when
    /// the price crosses it. The first full-window tick only establishes the
    /// baseline position and never emits.
    pub fn process(&mut self, tick: &Tick) -> Option<Signal> {
        self.window.push_back(tick.price);
        if self.window.len() > self.window_size {
            self.window.pop_front();
        }

        // Not enough data yet
        if self.window.len() < self.window_size {
            return None;
        }

        let sma = self.average();
        // Equality is not above
        let is_above = tick.price > sma;

        tracing::debug!(
            symbol = %tick.symbol,
            price = %tick.price,
            %sma,
            is_above,
            "Evaluated tick"
        );

        let signal_type = match self.position {
            Position::Unknown => None,
            Position::Below if is_above => Some(SignalType::Buy),
            Position::Above if !is_above => Some(SignalType::Sell),
            _ => None,
        };

        self.position = if is_above {
            Position::Above
        } else {
            Position::Below
        };

        signal_type.map(|signal_type| {
            tracing::info!(
                signal = ?signal_type,
                symbol = %tick.symbol,
                price = %tick.price,
                %sma,
                "Crossover detected"
            );
            Signal::new(signal_type, tick.symbol.clone(), tick.price, self.name.clone())
        })
    }

    /// Arithmetic mean of the window, rounded half-up
    fn average(&self) -> Decimal {
        let sum: Decimal = self.window.iter().sum();
        (sum / Decimal::from(self.window_size))
            .round_dp_with_strategy(SMA_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Current position relative to the average
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of prices currently in the window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(price: Decimal) -> Tick {
        Tick::new("BTCUSDT", price)
    }

    fn feed(strategy: &mut SmaCrossover, prices: &[Decimal]) -> Vec<Signal> {
        prices
            .iter()
            .filter_map(|p| strategy.process(&tick(*p)))
            .collect()
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            SmaCrossover::new(0),
            Err(StrategyError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_name_includes_window() {
        let strategy = SmaCrossover::new(5).unwrap();
        assert_eq!(strategy.name(), "SMA-5");
    }

    #[test]
    fn test_no_signal_until_window_full() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        assert!(strategy.process(&tick(dec!(10))).is_none());
        assert!(strategy.process(&tick(dec!(20))).is_none());
        assert_eq!(strategy.position(), Position::Unknown);
        assert_eq!(strategy.window_len(), 2);
    }

    #[test]
    fn test_baseline_tick_sets_position_without_signal() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        let signals = feed(&mut strategy, &[dec!(10), dec!(20), dec!(30)]);
        assert!(signals.is_empty());
        // 30 > mean(10,20,30) = 20
        assert_eq!(strategy.position(), Position::Above);
    }

    #[test]
    fn test_equal_price_and_mean_is_not_above() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(100)]);
        assert!(signals.is_empty());
        assert_eq!(strategy.position(), Position::Below);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut strategy = SmaCrossover::new(2).unwrap();

        feed(&mut strategy, &[dec!(10), dec!(20), dec!(30)]);
        assert_eq!(strategy.window_len(), 2);
        // window is now [20, 30]
        assert_eq!(strategy.average(), dec!(25));
    }

    #[test]
    fn test_mean_is_exact_decimal() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        feed(&mut strategy, &[dec!(10), dec!(20), dec!(30)]);
        assert_eq!(strategy.average(), dec!(20));
    }

    #[test]
    fn test_mean_rounds_half_up_at_ten_digits() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        // 5/3 = 1.666... rounds up at the tenth digit
        feed(&mut strategy, &[dec!(1), dec!(2), dec!(2)]);
        assert_eq!(strategy.average(), dec!(1.6666666667));
    }

    #[test]
    fn test_mean_rounds_exact_midpoint_up() {
        let mut strategy = SmaCrossover::new(2).unwrap();

        // (0.0000000001 + 0.0000000002) / 2 = 0.00000000015
        feed(&mut strategy, &[dec!(0.0000000001), dec!(0.0000000002)]);
        assert_eq!(strategy.average(), dec!(0.0000000002));
    }

    #[test]
    fn test_single_buy_on_upward_crossover() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        // Flat baseline leaves the position Below (100 is not above 100)
        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(100)]);
        assert!(signals.is_empty());

        // Rising prices cross the mean exactly once
        let signals = feed(&mut strategy, &[dec!(101), dec!(102), dec!(103)]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Buy);
        assert_eq!(signals[0].price, dec!(101));
        assert_eq!(signals[0].symbol, "BTCUSDT");
        assert_eq!(signals[0].strategy, "SMA-3");
    }

    #[test]
    fn test_mirrored_sequence_sells_at_mirrored_position() {
        // BUY case: baseline ends below the mean, then price crosses above
        let mut buys = SmaCrossover::new(3).unwrap();
        let signals = feed(&mut buys, &[dec!(101), dec!(100), dec!(99), dec!(102)]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Buy);
        assert_eq!(signals[0].price, dec!(102));

        // Every price reflected around the resting mean of 100 produces the
        // SELL at the mirrored position
        let mut sells = SmaCrossover::new(3).unwrap();
        let signals = feed(&mut sells, &[dec!(99), dec!(100), dec!(101), dec!(98)]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Sell);
        assert_eq!(signals[0].price, dec!(98));
    }

    #[test]
    fn test_no_sell_without_downward_crossover() {
        let mut strategy = SmaCrossover::new(3).unwrap();

        // Strictly rising after the baseline: price stays above the mean
        let signals = feed(
            &mut strategy,
            &[dec!(100), dec!(100), dec!(100), dec!(101), dec!(102), dec!(103), dec!(104)],
        );
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Buy);
    }

    #[test]
    fn test_alternating_crossovers() {
        let mut strategy = SmaCrossover::new(2).unwrap();

        // [10, 10] -> mean 10, Below
        // 20: window [10, 20], mean 15, above -> BUY
        // 5: window [20, 5], mean 12.5, below -> SELL
        // 30: window [5, 30], mean 17.5, above -> BUY
        let signals = feed(&mut strategy, &[dec!(10), dec!(10), dec!(20), dec!(5), dec!(30)]);
        let types: Vec<SignalType> = signals.iter().map(|s| s.signal_type).collect();
        assert_eq!(types, vec![SignalType::Buy, SignalType::Sell, SignalType::Buy]);
    }

    #[test]
    fn test_breakout_after_flat_five_tick_window() {
        let mut strategy = SmaCrossover::new(5).unwrap();

        // Five ticks at 100: mean 100, baseline Below, no signal
        let signals = feed(&mut strategy, &[dec!(100); 5]);
        assert!(signals.is_empty());
        assert_eq!(strategy.position(), Position::Below);

        // 101 against window [100,100,100,100,101], mean 100.2
        let signal = strategy.process(&tick(dec!(101))).expect("BUY expected");
        assert_eq!(signal.signal_type, SignalType::Buy);
        assert_eq!(signal.price, dec!(101));
    }
}
