use num_traits::{One, Zero};

use nalgebra::allocator::Allocator;
use nalgebra::core::dimension::U2;
use nalgebra::core::MatrixN;
use nalgebra::{DefaultAllocator, RealField};

use adskalman::TransitionModelLinearNoControl;

/// constant velocity 1D motion model parameterized by `dt`
///
/// The important method is `calc_for_dt()`. Calling this
/// returns a motion model for a specific `dt`.
///
/// The state vector is [value, velocity]. Used by `artrack-flow` to smooth
/// each of scale, rotation and aspect independently across frames.
#[derive(Debug)]
pub struct ConstantVelocity1DModel<R: RealField>
where
    DefaultAllocator: Allocator<R, U2, U2>,
    DefaultAllocator: Allocator<R, U2>,
{
    motion_noise_scale: R,
}

impl<R: RealField> ConstantVelocity1DModel<R>
where
    DefaultAllocator: Allocator<R, U2, U2>,
    DefaultAllocator: Allocator<R, U2>,
{
    pub fn new(motion_noise_scale: R) -> Self {
        Self { motion_noise_scale }
    }

    /// For a given `dt`, create a new instance of the motion model.
    pub fn calc_for_dt(&self, dt: R) -> MotionModel1DFixedDt<R> {
        let zero: R = Zero::zero();
        let one: R = One::one();
        let two: R = one + one;
        let three: R = two + one;

        // Create transition model. 1D value and 1D velocity.
        // This is "A" in most Kalman filter descriptions.
        #[rustfmt::skip]
        let transition_model = MatrixN::<R, U2>::new(
                          one,   dt,
                         zero,  one);
        let transition_model_transpose = transition_model.transpose();

        let t33 = (dt * dt * dt) / three;
        let t22 = (dt * dt) / two;

        // Same discretized-white-noise-acceleration form as the 2D model.
        #[rustfmt::skip]
        let transition_noise_covariance = MatrixN::<R, U2>::new(
                        t33,  t22,
                        t22,   dt) * self.motion_noise_scale;
        MotionModel1DFixedDt {
            transition_model,
            transition_model_transpose,
            transition_noise_covariance,
        }
    }
}

/// constant velocity 1D motion model for fixed dt
///
/// The state vector is [value, velocity].
#[derive(Debug)]
pub struct MotionModel1DFixedDt<R: RealField>
where
    DefaultAllocator: Allocator<R, U2, U2>,
    DefaultAllocator: Allocator<R, U2>,
{
    transition_model: MatrixN<R, U2>,
    transition_model_transpose: MatrixN<R, U2>,
    transition_noise_covariance: MatrixN<R, U2>,
}

impl<R: RealField> TransitionModelLinearNoControl<R, U2> for MotionModel1DFixedDt<R>
where
    DefaultAllocator: Allocator<R, U2, U2>,
    DefaultAllocator: Allocator<R, U2>,
{
    fn F(&self) -> &MatrixN<R, U2> {
        &self.transition_model
    }
    fn FT(&self) -> &MatrixN<R, U2> {
        &self.transition_model_transpose
    }
    fn Q(&self) -> &MatrixN<R, U2> {
        &self.transition_noise_covariance
    }
}
