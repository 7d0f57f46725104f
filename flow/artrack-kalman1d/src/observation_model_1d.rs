use num_traits::{One, Zero};

use nalgebra::allocator::Allocator;
use nalgebra::core::dimension::DimMin;
use nalgebra::core::dimension::{U1, U2};
use nalgebra::{DefaultAllocator, OMatrix, OVector, RealField};

use adskalman::ObservationModel;

/// Direct observation of the value component of a [`crate::motion_model_1d`]
/// state; velocity is never observed directly.
#[derive(Debug)]
pub struct ObservationModel1D<R: RealField> {
    observation_matrix: OMatrix<R, U1, U2>,
    observation_matrix_transpose: OMatrix<R, U2, U1>,
    observation_noise_covariance: OMatrix<R, U1, U1>,
}

impl<R: RealField> ObservationModel1D<R> {
    pub fn new(observation_noise_covariance: OMatrix<R, U1, U1>) -> Self {
        let zero: R = Zero::zero();
        let one: R = One::one();

        #[rustfmt::skip]
        let observation_matrix = OMatrix::<R, U1, U2>::new(
                          one, zero);
        let observation_matrix_transpose = observation_matrix.transpose();
        Self {
            observation_matrix,
            observation_matrix_transpose,
            observation_noise_covariance,
        }
    }
}

impl<R: RealField> ObservationModel<R, U2, U1> for ObservationModel1D<R>
where
    DefaultAllocator: Allocator<R, U2, U2>,
    DefaultAllocator: Allocator<R, U2>,
    DefaultAllocator: Allocator<R, U1, U2>,
    DefaultAllocator: Allocator<R, U2, U1>,
    DefaultAllocator: Allocator<R, U1, U1>,
    DefaultAllocator: Allocator<R, U1>,
    DefaultAllocator: Allocator<(usize, usize), U1>,
    U1: DimMin<U1, Output = U1>,
{
    fn H(&self) -> &OMatrix<R, U1, U2> {
        &self.observation_matrix
    }
    fn HT(&self) -> &OMatrix<R, U2, U1> {
        &self.observation_matrix_transpose
    }
    fn R(&self) -> &OMatrix<R, U1, U1> {
        &self.observation_noise_covariance
    }
    fn predict_observation(&self, state: &OVector<R, U2>) -> OVector<R, U1> {
        &self.observation_matrix * state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion_model_1d::ConstantVelocity1DModel;
    use adskalman::{CovarianceUpdateMethod, StateAndCovariance, TransitionModelLinearNoControl};
    use nalgebra::{OMatrix, OVector, U1, U2};

    #[test]
    fn filter_converges_on_constant_value() {
        let motion = ConstantVelocity1DModel::new(1e-3f64).calc_for_dt(1.0);
        let observation = ObservationModel1D::new(OMatrix::<f64, U1, U1>::new(0.01));

        let initial_state = OVector::<f64, U2>::new(0.0, 0.0);
        let initial_covariance = OMatrix::<f64, U2, U2>::identity() * 10.0;
        let mut estimate = StateAndCovariance::new(initial_state, initial_covariance);

        for _ in 0..50 {
            let prior = motion.predict(&estimate);
            let measurement = OVector::<f64, U1>::new(5.0);
            estimate = observation
                .update(&prior, &measurement, CovarianceUpdateMethod::JosephForm)
                .unwrap();
        }

        assert!((estimate.state()[0] - 5.0).abs() < 0.1);
    }
}
