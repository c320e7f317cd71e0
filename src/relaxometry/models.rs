//! Signal models — parametric intensity curves fitted per voxel.
//!
//! Purpose
//! -------
//! Describe the physical signal equations the engine can fit. Every model has
//! a fixed parameter vector `p = (S0, T, offset)` (amplitude, decay constant,
//! additive offset) and may carry acquisition constants that are fixed when
//! the model is constructed.
//!
//! Key behaviors
//! -------------
//! - [`SignalModel::evaluate`] / [`SignalModel::evaluate_all`] compute the
//!   predicted signal at one or many independent-variable values.
//! - [`SignalModel::jacobian`] returns an analytic Jacobian where one is
//!   cheap (mono-exponential); the optimizer finite-differences the rest.
//! - [`SignalModel::from_constants`] builds a model from a name and a map of
//!   named acquisition constants (`TR`, `T1`, `alpha`, `TE`, `T2star`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Evaluation never panics. Out-of-domain parameters (e.g. a zero decay
//!   constant) produce NaN or ±inf, which the optimizer treats as a bad step.
//! - Constants are finite; constructors reject anything else.
//! - `alpha` is the flip angle in radians.
//!
//! Conventions
//! -----------
//! - The independent variable `t` is an echo time (T2/T2*) or a spin-lock
//!   duration (T1ρ), in the same unit as the decay constant.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        least_squares::{
            JacobianMatrix, ResidualModel, Residuals, Theta, validation::validate_theta_input,
        },
    },
    relaxometry::errors::{RelaxError, RelaxResult},
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Number of free parameters shared by every shipped model.
pub const N_PARAMS: usize = 3;

const MONO_EXP_NAMES: [&str; N_PARAMS] = ["S0", "T2", "offset"];
const T1RHO_NAMES: [&str; N_PARAMS] = ["S0", "T1rho", "offset"];

/// Parametric signal model with its acquisition constants baked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalModel {
    /// `S(t) = S0·exp(−t/T) + offset` (T2 / T2* decay).
    MonoExponential,

    /// Spin-lock signal with incomplete recovery (Rausch et al., Eq. 4).
    ///
    /// `S0·sin α·(1 − e^{−(TR−t)/T1})·e^{−t/T1ρ} / (1 − cos α·e^{−t/T1ρ}·e^{−(TR−t)/T1}) + offset`
    T1rhoRausch { tr: f64, t1: f64, alpha: f64 },

    /// 3-D spin-lock signal (Aronen et al., appendix), with `τ = TR − t`.
    ///
    /// `S0·e^{−t/T1ρ}·(1 − e^{−τ/T1})·sin α·e^{−TE/T2*} / (1 − cos α·e^{τ/T1}·e^{t/T1ρ}) + offset`
    T1rhoAronen { tr: f64, t1: f64, alpha: f64, te: f64, t2star: f64 },
}

impl SignalModel {
    pub const fn mono_exponential() -> Self {
        SignalModel::MonoExponential
    }

    /// Construct a Rausch T1ρ model.
    ///
    /// # Errors
    /// [`RelaxError::InvalidModelConstant`] if any constant is non-finite.
    pub fn t1rho_rausch(tr: f64, t1: f64, alpha: f64) -> RelaxResult<Self> {
        check_constant("TR", tr)?;
        check_constant("T1", t1)?;
        check_constant("alpha", alpha)?;
        Ok(SignalModel::T1rhoRausch { tr, t1, alpha })
    }

    /// Construct an Aronen T1ρ model.
    ///
    /// # Errors
    /// [`RelaxError::InvalidModelConstant`] if any constant is non-finite.
    pub fn t1rho_aronen(tr: f64, t1: f64, alpha: f64, te: f64, t2star: f64) -> RelaxResult<Self> {
        check_constant("TR", tr)?;
        check_constant("T1", t1)?;
        check_constant("alpha", alpha)?;
        check_constant("TE", te)?;
        check_constant("T2star", t2star)?;
        Ok(SignalModel::T1rhoAronen { tr, t1, alpha, te, t2star })
    }

    /// Build a model from its name and a map of acquisition constants.
    ///
    /// Accepted names (case-insensitive): `"mono_exponential"`, `"t2"`,
    /// `"t2star"`, `"t1rho_rausch"`, `"t1rho_aronen"` and `"t1rho"` (Aronen).
    ///
    /// # Errors
    /// - [`RelaxError::UnknownModel`] for an unrecognized name.
    /// - [`RelaxError::MissingModelConstant`] if a required key is absent.
    /// - [`RelaxError::InvalidModelConstant`] for non-finite constants.
    pub fn from_constants(name: &str, constants: &HashMap<String, f64>) -> RelaxResult<Self> {
        match name.to_lowercase().as_str() {
            "mono_exponential" | "t2" | "t2star" => Ok(SignalModel::MonoExponential),
            "t1rho_rausch" => T1rhoConfig::from_map(constants)?.rausch(),
            "t1rho" | "t1rho_aronen" => T1rhoConfig::from_map(constants)?.aronen(),
            _ => Err(RelaxError::UnknownModel { name: name.to_string() }),
        }
    }

    pub const fn n_params(&self) -> usize {
        N_PARAMS
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            SignalModel::MonoExponential => &MONO_EXP_NAMES,
            SignalModel::T1rhoRausch { .. } | SignalModel::T1rhoAronen { .. } => &T1RHO_NAMES,
        }
    }

    /// Whether the amplitude/decay/offset seed heuristic applies.
    pub const fn supports_initial_estimate(&self) -> bool {
        self.n_params() == 3
    }

    /// Predicted signal at `t` for parameters `p = (S0, T, offset)`.
    ///
    /// Returns NaN when `p` does not have exactly [`N_PARAMS`] entries.
    pub fn evaluate(&self, t: f64, p: &[f64]) -> f64 {
        let [s0, decay, offset] = match p {
            [a, b, c] => [*a, *b, *c],
            _ => return f64::NAN,
        };
        match *self {
            SignalModel::MonoExponential => s0 * (-t / decay).exp() + offset,
            SignalModel::T1rhoRausch { tr, t1, alpha } => {
                let recovery = (-(tr - t) / t1).exp();
                let lock = (-t / decay).exp();
                let numerator = (1.0 - recovery) * lock;
                let denominator = 1.0 - alpha.cos() * lock * recovery;
                s0 * alpha.sin() * numerator / denominator + offset
            }
            SignalModel::T1rhoAronen { tr, t1, alpha, te, t2star } => {
                let tau = tr - t;
                let numerator = s0
                    * (-t / decay).exp()
                    * (1.0 - (-tau / t1).exp())
                    * alpha.sin()
                    * (-te / t2star).exp();
                let denominator = 1.0 - alpha.cos() * (tau / t1).exp() * (t / decay).exp();
                numerator / denominator + offset
            }
        }
    }

    pub fn evaluate_all(&self, x: &[f64], p: &[f64]) -> Array1<f64> {
        x.iter().map(|&t| self.evaluate(t, p)).collect()
    }

    /// Analytic Jacobian `∂S(x_i)/∂p_j`, where available.
    ///
    /// Only the mono-exponential model provides one; T1ρ models return `None`
    /// and are finite-differenced by the optimizer.
    pub fn jacobian(&self, x: &[f64], p: &[f64]) -> Option<Array2<f64>> {
        match (self, p) {
            (SignalModel::MonoExponential, &[s0, decay, _]) => {
                let mut jac = Array2::zeros((x.len(), N_PARAMS));
                for (i, &t) in x.iter().enumerate() {
                    let e = (-t / decay).exp();
                    jac[[i, 0]] = e;
                    jac[[i, 1]] = s0 * e * t / (decay * decay);
                    jac[[i, 2]] = 1.0;
                }
                Some(jac)
            }
            _ => None,
        }
    }
}

fn check_constant(name: &'static str, value: f64) -> RelaxResult<()> {
    if !value.is_finite() {
        return Err(RelaxError::InvalidModelConstant { name, value });
    }
    Ok(())
}

/// Named T1ρ acquisition constants.
///
/// Mirrors a key/value acquisition config: `TR`, `T1` and `alpha` are always
/// required; `TE` and `T2star` only for the Aronen model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct T1rhoConfig {
    pub tr: f64,
    pub t1: f64,
    pub alpha: f64,
    pub te: Option<f64>,
    pub t2star: Option<f64>,
}

impl T1rhoConfig {
    /// Read constants from a key/value map.
    ///
    /// # Errors
    /// [`RelaxError::MissingModelConstant`] if `TR`, `T1` or `alpha` is absent.
    pub fn from_map(constants: &HashMap<String, f64>) -> RelaxResult<Self> {
        let required = |name: &'static str| {
            constants.get(name).copied().ok_or(RelaxError::MissingModelConstant { name })
        };
        Ok(Self {
            tr: required("TR")?,
            t1: required("T1")?,
            alpha: required("alpha")?,
            te: constants.get("TE").copied(),
            t2star: constants.get("T2star").copied(),
        })
    }

    pub fn rausch(&self) -> RelaxResult<SignalModel> {
        SignalModel::t1rho_rausch(self.tr, self.t1, self.alpha)
    }

    /// # Errors
    /// [`RelaxError::MissingModelConstant`] if `TE` or `T2star` is absent.
    pub fn aronen(&self) -> RelaxResult<SignalModel> {
        let te = self.te.ok_or(RelaxError::MissingModelConstant { name: "TE" })?;
        let t2star = self.t2star.ok_or(RelaxError::MissingModelConstant { name: "T2star" })?;
        SignalModel::t1rho_aronen(self.tr, self.t1, self.alpha, te, t2star)
    }
}

/// One voxel's curve: independent variable and observed signal.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveData {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

impl ResidualModel for SignalModel {
    type Data = CurveData;

    fn residuals(&self, theta: &Theta, data: &CurveData) -> OptResult<Residuals> {
        let p = theta.as_slice().ok_or(OptError::UnknownError)?;
        let x = data.x.as_slice().ok_or(OptError::UnknownError)?;
        Ok(self.evaluate_all(x, p) - &data.y)
    }

    fn check(&self, theta: &Theta, data: &CurveData) -> OptResult<()> {
        validate_theta_input(theta, self.n_params())?;
        if data.x.len() != data.y.len() {
            return Err(OptError::ResidualDimMismatch {
                expected: data.x.len(),
                found: data.y.len(),
            });
        }
        Ok(())
    }

    fn jacobian(&self, theta: &Theta, data: &CurveData) -> OptResult<JacobianMatrix> {
        let p = theta.as_slice().ok_or(OptError::UnknownError)?;
        let x = data.x.as_slice().ok_or(OptError::UnknownError)?;
        SignalModel::jacobian(self, x, p).ok_or(OptError::JacobianNotImplemented)
    }
}
