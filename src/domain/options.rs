//! Option analytics: Black-Scholes-Merton pricing, implied volatility,
//! and Greeks.
//!
//! All functions are stateless and pure. Dividend yield enters as a
//! continuous carry adjustment to spot, time to expiry is expressed in
//! years (calendar days / 365).

use std::f64::consts::PI;

use super::bar::OptionRight;
use super::error::HistsimError;

/// Implied-volatility solve result.
///
/// `converged == false` means the iteration budget ran out; `volatility`
/// is then the best estimate found and must not be treated as exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedVol {
    pub price: f64,
    pub volatility: f64,
    pub converged: bool,
}

/// Closed-form Black-Scholes-Merton sensitivities.
///
/// Gamma and vega are identical for calls and puts at the same parameters;
/// delta and theta differ by option right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Greeks {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

const PRICE_TOLERANCE: f64 = 1e-6;
const MAX_ITERATIONS: u32 = 100;
const VOL_FLOOR: f64 = 1e-4;

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

fn norm_pdf(x: f64) -> f64 {
    (-(x * x) / 2.0).exp() / (2.0 * PI).sqrt()
}

fn d1_d2(spot: f64, strike: f64, t: f64, rate: f64, yield_: f64, vol: f64) -> (f64, f64) {
    let sqrt_t = t.sqrt();
    let d1 = ((spot / strike).ln() + (rate - yield_ + vol * vol / 2.0) * t) / (vol * sqrt_t);
    (d1, d1 - vol * sqrt_t)
}

/// Theoretical option price under Black-Scholes-Merton.
pub fn bs_price(
    spot: f64,
    strike: f64,
    t: f64,
    rate: f64,
    yield_: f64,
    vol: f64,
    right: OptionRight,
) -> f64 {
    let (d1, d2) = d1_d2(spot, strike, t, rate, yield_, vol);
    let disc_spot = spot * (-yield_ * t).exp();
    let disc_strike = strike * (-rate * t).exp();
    match right {
        OptionRight::Call => disc_spot * norm_cdf(d1) - disc_strike * norm_cdf(d2),
        OptionRight::Put => disc_strike * norm_cdf(-d2) - disc_spot * norm_cdf(-d1),
    }
}

fn validate_common(spot: f64, strike: f64, t: f64) -> Result<(), HistsimError> {
    if t <= 0.0 {
        return Err(HistsimError::OutOfBounds {
            reason: format!("time to expiry {t} is not positive"),
        });
    }
    if spot <= 0.0 || strike <= 0.0 {
        return Err(HistsimError::OutOfBounds {
            reason: format!("spot {spot} and strike {strike} must be positive"),
        });
    }
    Ok(())
}

/// Solves for the volatility that reproduces `market_price`.
///
/// Newton-Raphson seeded from the Brenner-Subrahmanyam estimate, with
/// bisection fallback on a maintained bracket. The price-to-volatility
/// mapping is monotonic, so the bracket always tightens. Quotes outside
/// the no-arbitrage bounds implied by the carry-adjusted forward, or a
/// non-positive time to expiry, fail with `OutOfBounds`.
pub fn solve_implied_volatility(
    spot: f64,
    strike: f64,
    t: f64,
    rate: f64,
    yield_: f64,
    market_price: f64,
    right: OptionRight,
) -> Result<ImpliedVol, HistsimError> {
    solve_with_budget(spot, strike, t, rate, yield_, market_price, right, MAX_ITERATIONS)
}

#[allow(clippy::too_many_arguments)]
fn solve_with_budget(
    spot: f64,
    strike: f64,
    t: f64,
    rate: f64,
    yield_: f64,
    market_price: f64,
    right: OptionRight,
    budget: u32,
) -> Result<ImpliedVol, HistsimError> {
    validate_common(spot, strike, t)?;

    let disc_spot = spot * (-yield_ * t).exp();
    let disc_strike = strike * (-rate * t).exp();
    let (lower, upper) = match right {
        OptionRight::Call => ((disc_spot - disc_strike).max(0.0), disc_spot),
        OptionRight::Put => ((disc_strike - disc_spot).max(0.0), disc_strike),
    };
    if market_price <= lower || market_price >= upper {
        return Err(HistsimError::OutOfBounds {
            reason: format!(
                "price {market_price} outside no-arbitrage bounds ({lower}, {upper})"
            ),
        });
    }

    let mut lo = VOL_FLOOR;
    let mut hi = 5.0;
    while bs_price(spot, strike, t, rate, yield_, hi, right) < market_price && hi < 64.0 {
        hi *= 2.0;
    }

    // Brenner-Subrahmanyam at-the-money seed
    let mut vol = ((2.0 * PI / t).sqrt() * market_price / disc_spot).clamp(0.05, 2.0);
    if vol <= lo || vol >= hi {
        vol = 0.5 * (lo + hi);
    }

    let mut best_vol = vol;
    let mut best_diff = f64::INFINITY;

    for _ in 0..budget {
        let price = bs_price(spot, strike, t, rate, yield_, vol, right);
        let diff = price - market_price;

        if diff.abs() < best_diff {
            best_diff = diff.abs();
            best_vol = vol;
        }
        if diff.abs() < PRICE_TOLERANCE {
            return Ok(ImpliedVol {
                price,
                volatility: vol,
                converged: true,
            });
        }

        if diff > 0.0 {
            hi = vol;
        } else {
            lo = vol;
        }

        let (d1, _) = d1_d2(spot, strike, t, rate, yield_, vol);
        let vega = disc_spot * norm_pdf(d1) * t.sqrt();
        let newton = vol - diff / vega;
        vol = if vega > 1e-10 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    Ok(ImpliedVol {
        price: bs_price(spot, strike, t, rate, yield_, best_vol, right),
        volatility: best_vol,
        converged: false,
    })
}

/// Evaluates price and Greeks from the closed-form partial derivatives.
///
/// Theta is the raw closed-form decay term; its magnitude convention
/// matches the simulator's historical fixtures and must stay unscaled.
pub fn evaluate_greeks(
    spot: f64,
    strike: f64,
    t: f64,
    rate: f64,
    yield_: f64,
    vol: f64,
    right: OptionRight,
) -> Result<Greeks, HistsimError> {
    validate_common(spot, strike, t)?;
    if vol <= 0.0 {
        return Err(HistsimError::OutOfBounds {
            reason: format!("volatility {vol} is not positive"),
        });
    }

    let sqrt_t = t.sqrt();
    let (d1, d2) = d1_d2(spot, strike, t, rate, yield_, vol);
    let disc_spot = spot * (-yield_ * t).exp();
    let disc_strike = strike * (-rate * t).exp();

    let price = bs_price(spot, strike, t, rate, yield_, vol, right);
    let gamma = (-yield_ * t).exp() * norm_pdf(d1) / (spot * vol * sqrt_t);
    let vega = disc_spot * norm_pdf(d1) * sqrt_t;
    let decay = -disc_spot * norm_pdf(d1) * vol / (2.0 * sqrt_t);

    let (delta, theta) = match right {
        OptionRight::Call => (
            (-yield_ * t).exp() * norm_cdf(d1),
            decay - rate * disc_strike * norm_cdf(d2) + yield_ * disc_spot * norm_cdf(d1),
        ),
        OptionRight::Put => (
            -(-yield_ * t).exp() * norm_cdf(-d1),
            decay + rate * disc_strike * norm_cdf(-d2) - yield_ * disc_spot * norm_cdf(-d1),
        ),
    };

    Ok(Greeks {
        price,
        delta,
        gamma,
        theta,
        vega,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // SPX quotes from 2015-10-01: S=1921.42, r=0.024, q=0.018, T=15/365.
    const SPOT: f64 = 1921.42;
    const RATE: f64 = 0.024;
    const YIELD: f64 = 0.018;
    const T: f64 = 15.0 / 365.0;

    struct Vector {
        strike: f64,
        right: OptionRight,
        mid: f64,
        iv: f64,
        delta: f64,
        gamma: f64,
        theta: f64,
        vega: f64,
    }

    fn vectors() -> Vec<Vector> {
        vec![
            Vector {
                strike: 1845.0,
                right: OptionRight::Call,
                mid: (85.80 + 90.00) / 2.0,
                iv: 0.247698736469922,
                delta: 0.798543648749816,
                gamma: 0.00290809275058303,
                theta: -336.456110965229,
                vega: 109.213844026198,
            },
            Vector {
                strike: 1980.0,
                right: OptionRight::Call,
                mid: (6.80 + 8.20) / 2.0,
                iv: 0.172841571785126,
                delta: 0.202310532937698,
                gamma: 0.00418736136877768,
                theta: -233.066963429968,
                vega: 109.732253332688,
            },
            Vector {
                strike: 1845.0,
                right: OptionRight::Put,
                mid: (9.40 + 11.60) / 2.0,
                iv: 0.242329894301333,
                delta: -0.195851223514913,
                gamma: 0.00292882797276422,
                theta: -314.974565405346,
                vega: 107.608482003309,
            },
            Vector {
                strike: 1980.0,
                right: OptionRight::Put,
                mid: (63.20 + 67.90) / 2.0,
                iv: 0.172848420338619,
                delta: -0.796940829541531,
                gamma: 0.00418731537928118,
                theta: -220.169637364834,
                vega: 109.735396057305,
            },
        ]
    }

    #[test]
    fn historical_quote_fixtures() {
        for v in vectors() {
            let iv =
                solve_implied_volatility(SPOT, v.strike, T, RATE, YIELD, v.mid, v.right).unwrap();
            assert!(iv.converged);
            assert!(
                (iv.volatility - v.iv).abs() < 1e-3,
                "iv {} vs {}",
                iv.volatility,
                v.iv
            );

            let greeks =
                evaluate_greeks(SPOT, v.strike, T, RATE, YIELD, iv.volatility, v.right).unwrap();
            assert!((greeks.delta - v.delta).abs() < 1e-3);
            assert!((greeks.gamma - v.gamma).abs() < 1e-5);
            assert!((greeks.theta - v.theta).abs() < 0.5);
            assert!((greeks.vega - v.vega).abs() < 0.2);
        }
    }

    #[test]
    fn solved_volatility_reprices_the_quote() {
        for v in vectors() {
            let iv =
                solve_implied_volatility(SPOT, v.strike, T, RATE, YIELD, v.mid, v.right).unwrap();
            let greeks =
                evaluate_greeks(SPOT, v.strike, T, RATE, YIELD, iv.volatility, v.right).unwrap();
            assert!(
                (greeks.price - v.mid).abs() < 1e-5,
                "round-trip {} vs {}",
                greeks.price,
                v.mid
            );
            assert!((iv.price - greeks.price).abs() < 1e-9);
        }
    }

    #[test]
    fn round_trip_across_parameter_grid() {
        for &strike in &[1500.0, 1845.0, 1921.42, 1980.0, 2400.0] {
            for &vol in &[0.08, 0.2477, 0.60] {
                for &t in &[7.0 / 365.0, 0.25, 1.5] {
                    for &right in &[OptionRight::Call, OptionRight::Put] {
                        let price = bs_price(SPOT, strike, t, RATE, YIELD, vol, right);
                        let disc_spot = SPOT * (-YIELD * t).exp();
                        let disc_strike = strike * (-RATE * t).exp();
                        let lower = match right {
                            OptionRight::Call => (disc_spot - disc_strike).max(0.0),
                            OptionRight::Put => (disc_strike - disc_spot).max(0.0),
                        };
                        // Skip grid points that price to the bound itself.
                        if price - lower < 1e-4 {
                            continue;
                        }
                        let iv = solve_implied_volatility(
                            SPOT, strike, t, RATE, YIELD, price, right,
                        )
                        .unwrap();
                        assert!(iv.converged);
                        assert_relative_eq!(iv.volatility, vol, max_relative = 1e-3);
                    }
                }
            }
        }
    }

    #[test]
    fn gamma_and_vega_shared_across_rights() {
        let call = evaluate_greeks(SPOT, 1900.0, T, RATE, YIELD, 0.25, OptionRight::Call).unwrap();
        let put = evaluate_greeks(SPOT, 1900.0, T, RATE, YIELD, 0.25, OptionRight::Put).unwrap();
        assert_relative_eq!(call.gamma, put.gamma, max_relative = 1e-12);
        assert_relative_eq!(call.vega, put.vega, max_relative = 1e-12);
        assert!(call.delta > 0.0 && put.delta < 0.0);
    }

    #[test]
    fn put_call_parity() {
        let t = 0.25;
        let vol = 0.2;
        let call = bs_price(SPOT, 1900.0, t, RATE, YIELD, vol, OptionRight::Call);
        let put = bs_price(SPOT, 1900.0, t, RATE, YIELD, vol, OptionRight::Put);
        let forward = SPOT * (-YIELD * t).exp() - 1900.0 * (-RATE * t).exp();
        assert_relative_eq!(call - put, forward, epsilon = 1e-9);
    }

    #[test]
    fn rejects_expired_and_degenerate_inputs() {
        let result =
            solve_implied_volatility(SPOT, 1845.0, 0.0, RATE, YIELD, 87.90, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));

        let result =
            solve_implied_volatility(-1.0, 1845.0, T, RATE, YIELD, 87.90, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));

        let result = evaluate_greeks(SPOT, 1845.0, -0.1, RATE, YIELD, 0.25, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));

        let result = evaluate_greeks(SPOT, 1845.0, T, RATE, YIELD, 0.0, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));
    }

    #[test]
    fn rejects_arbitrage_violating_quotes() {
        // Below intrinsic value for a deep call
        let result =
            solve_implied_volatility(SPOT, 1845.0, T, RATE, YIELD, 10.0, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));

        // Above the discounted spot, the call's upper bound
        let result =
            solve_implied_volatility(SPOT, 1845.0, T, RATE, YIELD, 2000.0, OptionRight::Call);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));

        // Negative premium
        let result =
            solve_implied_volatility(SPOT, 1980.0, T, RATE, YIELD, -1.0, OptionRight::Put);
        assert!(matches!(result, Err(HistsimError::OutOfBounds { .. })));
    }

    #[test]
    fn exhausted_budget_reports_non_convergence() {
        let result = solve_with_budget(
            SPOT,
            1845.0,
            T,
            RATE,
            YIELD,
            87.90,
            OptionRight::Call,
            2,
        )
        .unwrap();
        assert!(!result.converged);
        // Best estimate is still in the right neighbourhood.
        assert!(result.volatility > 0.0 && result.volatility < 5.0);
    }
}
