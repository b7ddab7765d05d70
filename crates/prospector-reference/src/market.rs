//! Station market: cyclic prices pushed down by inventory and recent sales

use std::f32::consts::TAU;

use prospector_core::RandomStream;
use prospector_core::constants::N_COMMODITIES;

use crate::tuning::{
    INVENTORY_PRESSURE, INVENTORY_RETENTION, PRICE_BANDS, PRICE_NOISE, SALES_MEMORY_TICKS,
    SALES_PRESSURE, SLIPPAGE_CAP, SLIPPAGE_LINEAR, SLIPPAGE_SQRT,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Commodity {
    pub price: f32,
    pub previous_price: f32,
    pub inventory: f32,
    pub recent_sales: f32,
    cycle_phase: f32,
    cycle_period: f32,
    cycle_amplitude: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub commodities: [Commodity; N_COMMODITIES],
}

impl Market {
    pub fn generate(rng: &mut RandomStream) -> Self {
        let commodities = std::array::from_fn(|c| {
            let band = PRICE_BANDS[c];
            let inventory = rng.uniform(20.0, 120.0);
            let cycle_phase = rng.uniform(0.0, TAU);
            let cycle_period = rng.uniform(180.0, 380.0);
            let cycle_amplitude = band.base * rng.uniform(0.10, 0.30);
            let price = (band.base + cycle_amplitude * cycle_phase.sin())
                .clamp(band.floor, band.ceiling);
            Commodity {
                price,
                previous_price: price,
                inventory,
                recent_sales: 0.0,
                cycle_phase,
                cycle_period,
                cycle_amplitude,
            }
        });
        Self { commodities }
    }

    /// Mark-to-market value of a hold
    pub fn value_of(&self, cargo: &[f32; N_COMMODITIES]) -> f32 {
        cargo
            .iter()
            .zip(&self.commodities)
            .map(|(amount, commodity)| amount * commodity.price)
            .sum()
    }

    /// Sell `qty` units; returns credits received after slippage
    pub fn sell(&mut self, commodity: usize, qty: f32) -> f32 {
        let entry = &mut self.commodities[commodity];
        let slip = slippage(qty, entry.inventory);
        let proceeds = qty * (entry.price * (1.0 - slip));
        entry.inventory += qty;
        entry.recent_sales += qty;
        proceeds
    }

    /// Move prices forward to tick `now`, `dt` ticks after the last update
    pub fn advance(&mut self, rng: &mut RandomStream, now: u32, dt: u32) {
        let t = now as f32;
        for (commodity, band) in self.commodities.iter_mut().zip(PRICE_BANDS) {
            commodity.previous_price = commodity.price;

            let cycle = commodity.cycle_amplitude
                * (TAU * (t / commodity.cycle_period) + commodity.cycle_phase).sin();
            let inventory_drag = INVENTORY_PRESSURE * commodity.inventory;
            let sales_drag = SALES_PRESSURE * commodity.recent_sales;
            let sigma = PRICE_NOISE * band.base * (dt.max(1) as f32).sqrt();
            let noise = rng.normal(0.0, sigma);

            commodity.price = (band.base + cycle - inventory_drag - sales_drag + noise)
                .clamp(band.floor, band.ceiling);
        }

        let decay = (-(dt as f32) / SALES_MEMORY_TICKS).exp();
        for commodity in self.commodities.iter_mut() {
            commodity.recent_sales *= decay;
            commodity.inventory = (commodity.inventory * INVENTORY_RETENTION).max(0.0);
        }
    }
}

/// Price impact of selling `qty` into a market holding `inventory`
pub fn slippage(qty: f32, inventory: f32) -> f32 {
    if qty <= 0.0 {
        return 0.0;
    }
    let ratio = qty / (inventory + qty).max(1.0);
    (SLIPPAGE_LINEAR * ratio + SLIPPAGE_SQRT * ratio.sqrt()).clamp(0.0, SLIPPAGE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prices_stay_in_band() {
        let mut rng = RandomStream::new(8);
        let mut market = Market::generate(&mut rng);
        for tick in 1..500 {
            market.advance(&mut rng, tick, 1);
            for (commodity, band) in market.commodities.iter().zip(PRICE_BANDS) {
                assert!(commodity.price >= band.floor && commodity.price <= band.ceiling);
                assert!(commodity.inventory >= 0.0);
            }
        }
    }

    #[test]
    fn test_slippage_grows_with_volume() {
        assert_eq!(slippage(0.0, 50.0), 0.0);
        let small = slippage(1.0, 100.0);
        let large = slippage(100.0, 100.0);
        assert!(small < large);
        assert!(slippage(1.0e6, 0.0) <= SLIPPAGE_CAP);
    }

    #[test]
    fn test_selling_raises_inventory() {
        let mut rng = RandomStream::new(1);
        let mut market = Market::generate(&mut rng);
        let before = market.commodities[2].inventory;
        let proceeds = market.sell(2, 10.0);
        assert!(proceeds > 0.0);
        assert!(proceeds <= 10.0 * market.commodities[2].price);
        assert_eq!(market.commodities[2].inventory, before + 10.0);
        assert_eq!(market.commodities[2].recent_sales, 10.0);
    }
}
