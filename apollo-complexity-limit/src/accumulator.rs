/// Running total of the cost charged while scoring one document.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostAccumulator {
    total: f64,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already multiplied contribution.
    ///
    /// Once the total is undefined, for instance after infinite contributions of opposite
    /// signs, it stays at infinity so that it is over any maximum.
    pub fn add(&mut self, cost: f64) {
        let total = self.total + cost;
        self.total = if total.is_nan() { f64::INFINITY } else { total };
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
