use crate::domain::TradeSide;

/// Single-asset cash and holdings tracker.
///
/// Buys spend all available cash on whole shares; sells liquidate the full
/// holding. Commission is charged on both legs as a fraction of notional.
#[derive(Debug, Clone)]
pub struct Account {
    cash: f64,
    holdings: f64,
    commission_rate: f64,
    commission_paid: f64,
    total_value: f64,
}

impl Account {
    pub fn new(initial_cash: f64, commission_rate: f64) -> Self {
        Self {
            cash: initial_cash,
            holdings: 0.0,
            commission_rate,
            commission_paid: 0.0,
            total_value: initial_cash,
        }
    }

    /// Whole shares that prior cash can pay for, commission included.
    pub fn affordable_shares(&self, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        (self.cash / (price * (1.0 + self.commission_rate))).floor()
    }

    /// Buy as many shares as cash allows. Returns the share count bought.
    pub fn buy_all(&mut self, price: f64) -> f64 {
        let shares = self.affordable_shares(price);
        let cost = shares * price * (1.0 + self.commission_rate);
        self.cash -= cost;
        self.holdings = shares;
        self.commission_paid += shares * price * self.commission_rate;
        shares
    }

    /// Liquidate all holdings. Returns the share count sold.
    pub fn sell_all(&mut self, price: f64) -> f64 {
        let shares = self.holdings;
        let revenue = shares * price * (1.0 - self.commission_rate);
        self.cash += revenue;
        self.holdings = 0.0;
        self.commission_paid += shares * price * self.commission_rate;
        shares
    }

    /// Execute one side at `price`, returning the share count.
    pub fn execute(&mut self, side: TradeSide, price: f64) -> f64 {
        match side {
            TradeSide::Buy => self.buy_all(price),
            TradeSide::Sell => self.sell_all(price),
        }
    }

    /// Revalue at `price`; returns (total_value, return vs previous mark).
    pub fn mark(&mut self, price: f64) -> (f64, f64) {
        let prev = self.total_value;
        let value = self.holdings * price + self.cash;
        self.total_value = value;
        let ret = if prev != 0.0 { value / prev - 1.0 } else { 0.0 };
        (value, ret)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holdings(&self) -> f64 {
        self.holdings
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    /// Commission charged across every fill so far.
    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }
}
