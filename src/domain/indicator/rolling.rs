//! Trailing-window statistics computed incrementally.
//!
//! A fixed-capacity ring buffer holds the last `period` values together with a
//! running mean and sum of squared deviations (Welford add/remove), so each
//! step is O(1). An undefined or non-finite input empties the window: a
//! statistic is only defined once `period` consecutive finite values have
//! been seen.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    mean: f64,
    m2: f64,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period),
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.period == 0 {
            return;
        }
        let Some(x) = value.filter(|x| x.is_finite()) else {
            self.reset();
            return;
        };

        if self.values.len() == self.period {
            if let Some(old) = self.values.pop_front() {
                self.remove(old);
            }
        }

        self.values.push_back(x);
        let n = self.values.len() as f64;
        let delta = x - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        let n = self.values.len();
        if n == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let delta = x - self.mean;
        self.mean -= delta / n as f64;
        self.m2 -= delta * (x - self.mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    fn reset(&mut self) {
        self.values.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
    }

    pub fn is_full(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    pub fn mean(&self) -> Option<f64> {
        self.is_full().then_some(self.mean)
    }

    /// Standard deviation with `ddof` delta degrees of freedom
    /// (0 = population, 1 = sample).
    pub fn stddev(&self, ddof: usize) -> Option<f64> {
        if !self.is_full() || self.period <= ddof {
            return None;
        }
        Some((self.m2 / (self.period - ddof) as f64).sqrt())
    }
}

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut window = RollingWindow::new(period);
    values
        .iter()
        .map(|&v| {
            window.push(v);
            window.mean()
        })
        .collect()
}

pub fn rolling_stddev(values: &[Option<f64>], period: usize, ddof: usize) -> Vec<Option<f64>> {
    let mut window = RollingWindow::new(period);
    values
        .iter()
        .map(|&v| {
            window.push(v);
            window.stddev(ddof)
        })
        .collect()
}
