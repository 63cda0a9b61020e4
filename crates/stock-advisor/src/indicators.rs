//! Technical Indicators
//!
//! Pure functions over price series. Series are ordered oldest-first; the
//! last element is the most recent session.

/// Exponential moving average seeded with the first value
/// (matches `ewm(span=period, adjust=False)` semantics).
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);

    for &v in &values[1..] {
        current = alpha * v + (1.0 - alpha) * current;
        out.push(current);
    }

    out
}

/// Simple moving average of the trailing `period` values, shrinking at the
/// head of the series (min_periods = 1).
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        let window = (i + 1).min(period);
        out.push(sum / window as f64);
    }

    out
}

/// Relative Strength Index with Wilder smoothing.
///
/// Returns `None` until `period + 1` prices are available, then RSI on the
/// 0-100 scale for every subsequent session.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut out = vec![None; n];

    if period == 0 || n <= period {
        return out;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut avg_gain: f64 = gains[1..=period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[1..=period].iter().sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        avg_gain = alpha * gains[i] + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * losses[i] + (1.0 - alpha) * avg_loss;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain <= 0.0 { 50.0 } else { 100.0 }
    } else if avg_gain <= 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

/// MACD line, signal line, and histogram series.
#[derive(Clone, Debug, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Moving Average Convergence Divergence.
///
/// MACD = EMA(fast) - EMA(slow); signal = EMA(MACD, signal_period);
/// histogram = MACD - signal. Standard parameters are (12, 26, 9).
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    if prices.is_empty() {
        return MacdSeries::default();
    }

    let ema_fast = ema(prices, fast);
    let ema_slow = ema(prices, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Maximum over the trailing `window` values (min_periods = 1).
pub fn rolling_max(values: &[f64], window: usize) -> Option<f64> {
    trailing_window(values, window)
        .iter()
        .copied()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

/// Minimum over the trailing `window` values (min_periods = 1).
pub fn rolling_min(values: &[f64], window: usize) -> Option<f64> {
    trailing_window(values, window)
        .iter()
        .copied()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
}

/// Mean over the trailing `window` values (min_periods = 1).
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    let tail = trailing_window(values, window);
    if tail.is_empty() {
        None
    } else {
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }
}

fn trailing_window(values: &[f64], window: usize) -> &[f64] {
    if window == 0 || values.is_empty() {
        return &[];
    }
    let start = values.len().saturating_sub(window);
    &values[start..]
}
