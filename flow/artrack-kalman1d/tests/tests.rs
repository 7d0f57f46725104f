extern crate artrack_kalman1d;
extern crate nalgebra as na;
extern crate adskalman;
#[macro_use]
extern crate approx;

use crate::na::core::{Matrix2, Vector2};

use adskalman::{StateAndCovariance, TransitionModelLinearNoControl};

/// Test that doing updates every frame without observations
/// is equal to doing an update with a longer dt.
#[test]
fn test_missing_frames_via_large_dt_1d() {
    use artrack_kalman1d::motion_model_1d::ConstantVelocity1DModel;

    let motion_noise_scale = 1.234;
    let model = ConstantVelocity1DModel::new(motion_noise_scale);

    let dt1 = 5.678;
    let state0 = Vector2::new(1.2, 3.4);
    let covar0 = 42.0 * Matrix2::<f64>::identity();

    let est0 = StateAndCovariance::new(state0, covar0);

    // Run two time steps of duration dt.
    let mm1 = model.calc_for_dt(dt1);
    let est1_1 = mm1.predict(&est0);
    let est1_2 = mm1.predict(&est1_1);

    // Run one time step of duration 2*dt.
    let mm2 = model.calc_for_dt(2.0 * dt1);
    let est2_2 = mm2.predict(&est0);

    assert_relative_eq!(est1_2.state(), est2_2.state());
    assert_relative_eq!(est1_2.covariance(), est2_2.covariance());
}
