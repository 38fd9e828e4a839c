//! Scalar function minimization
//!
//! Brent's method with an initial downhill bracketing phase. Used by the
//! power transformers to maximize per-feature log-likelihoods. Objective
//! values that come back NaN are never accepted as the running minimum, so
//! likelihoods may signal "do not prefer this point" by returning NaN.

use crate::error::{Result, TabprepError};

const GOLD: f64 = 1.618034;
const VERY_SMALL: f64 = 1e-21;
const GROW_LIMIT: f64 = 110.0;
const CG: f64 = 0.381_966_0;
const BRENT_TOL: f64 = 1.48e-8;
const MIN_TOL: f64 = 1e-11;
const MAX_ITER: usize = 500;
const MAX_BRACKET_ITER: usize = 1000;

/// Minimize a scalar function using Brent's method.
///
/// `bracket` is the starting interval for the downhill search; the final
/// minimizer may fall outside it if the function keeps descending.
pub fn minimize_scalar<F>(f: F, bracket: (f64, f64)) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let (xa, xb, xc, _fa, fb, _fc) = downhill_bracket(&f, bracket.0, bracket.1)?;
    Ok(brent_loop(&f, xa, xb, xc, fb))
}

/// Expand an initial interval into a triple (xa, xb, xc) with
/// f(xb) <= f(xa) and f(xb) <= f(xc).
fn downhill_bracket<F>(f: &F, xa0: f64, xb0: f64) -> Result<(f64, f64, f64, f64, f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let (mut xa, mut xb) = (xa0, xb0);
    let mut fa = f(xa);
    let mut fb = f(xb);
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLD * (xb - xa);
    let mut fc = f(xc);

    let mut iter = 0;
    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < VERY_SMALL {
            2.0 * VERY_SMALL
        } else {
            2.0 * val
        };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + GROW_LIMIT * (xc - xb);
        if iter >= MAX_BRACKET_ITER {
            return Err(TabprepError::ComputationError(
                "bracketing failed to converge".to_string(),
            ));
        }
        iter += 1;

        let mut fw;
        if (w - xc) * (xb - w) > 0.0 {
            // Parabolic candidate between xb and xc
            fw = f(w);
            if fw < fc {
                return Ok((xb, w, xc, fb, fw, fc));
            } else if fw > fb {
                return Ok((xa, xb, w, fa, fb, fw));
            }
            w = xc + GOLD * (xc - xb);
            fw = f(w);
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = f(w);
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = f(w);
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLD * (xc - xb);
                fb = fc;
                fc = fw;
                fw = f(w);
            }
        } else {
            w = xc + GOLD * (xc - xb);
            fw = f(w);
        }
        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }
    Ok((xa, xb, xc, fa, fb, fc))
}

fn brent_loop<F>(f: &F, xa: f64, xb: f64, xc: f64, fb: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let mut x = xb;
    let mut w = xb;
    let mut v = xb;
    let mut fx = fb;
    let mut fw = fb;
    let mut fv = fb;
    let (mut a, mut b) = if xa < xc { (xa, xc) } else { (xc, xa) };
    let mut deltax: f64 = 0.0;
    let mut rat: f64 = 0.0;

    for _ in 0..MAX_ITER {
        let tol1 = BRENT_TOL * x.abs() + MIN_TOL;
        let tol2 = 2.0 * tol1;
        let xmid = 0.5 * (a + b);
        if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
            break;
        }
        if deltax.abs() <= tol1 {
            // Golden section step
            deltax = if x >= xmid { a - x } else { b - x };
            rat = CG * deltax;
        } else {
            // Parabolic interpolation, with golden-section fallback
            let tmp1 = (x - w) * (fx - fv);
            let mut tmp2 = (x - v) * (fx - fw);
            let mut p = (x - v) * tmp2 - (x - w) * tmp1;
            tmp2 = 2.0 * (tmp2 - tmp1);
            if tmp2 > 0.0 {
                p = -p;
            }
            tmp2 = tmp2.abs();
            let dx_temp = deltax;
            deltax = rat;
            if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * dx_temp).abs() {
                rat = p / tmp2;
                let u = x + rat;
                if (u - a) < tol2 || (b - u) < tol2 {
                    rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                deltax = if x >= xmid { a - x } else { b - x };
                rat = CG * deltax;
            }
        }

        let u = if rat.abs() >= tol1 {
            x + rat
        } else if rat >= 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u);

        // A NaN objective is treated as worse than any finite value
        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }
    x
}
