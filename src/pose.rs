//! Head pose estimation from facial landmarks using a `PnP` solve.
//!
//! Six canonical 3D face model points are matched against their 2D landmark
//! projections under an approximate pinhole camera (focal length = frame
//! width, principal point at the frame centre, no distortion). The pose is
//! recovered by Levenberg-Marquardt minimization of the reprojection error
//! and reduced to yaw/pitch Euler angles.

use crate::constants::POSE_MODEL_POINTS;
use nalgebra::{Rotation3, SMatrix, SVector, Vector2, Vector3, Vector6};

const MAX_ITERATIONS: usize = 100;
const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e12;
/// Initial camera-frame depth guess in model units
const INITIAL_DEPTH: f64 = 1000.0;

/// Approximate pinhole camera intrinsics derived from frame dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub focal: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Build intrinsics for a frame: focal length equals the frame width,
    /// principal point sits at the frame centre.
    #[must_use]
    pub fn from_frame(frame_width: u32, frame_height: u32) -> Self {
        let w = f64::from(frame_width);
        let h = f64::from(frame_height);
        Self {
            focal: w,
            cx: w / 2.0,
            cy: h / 2.0,
        }
    }
}

/// Head orientation extracted from the recovered rotation
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadPose {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
}

fn model_points() -> [Vector3<f64>; 6] {
    POSE_MODEL_POINTS.map(|p| Vector3::new(p[0], p[1], p[2]))
}

fn project_point(
    rotation: &Rotation3<f64>,
    translation: &Vector3<f64>,
    point: &Vector3<f64>,
    intrinsics: &CameraIntrinsics,
) -> Option<Vector2<f64>> {
    let cam = rotation * point + translation;
    if cam.z.abs() < 1e-6 {
        return None;
    }
    Some(Vector2::new(
        intrinsics.focal * cam.x / cam.z + intrinsics.cx,
        intrinsics.focal * cam.y / cam.z + intrinsics.cy,
    ))
}

/// Stacked reprojection residuals for a 6-DoF pose parameter vector
/// (scaled-axis rotation in the first three components, translation in the
/// last three).
fn residuals(
    params: &Vector6<f64>,
    image_points: &[Vector2<f64>; 6],
    intrinsics: &CameraIntrinsics,
) -> Option<SVector<f64, 12>> {
    let rotation = Rotation3::from_scaled_axis(params.fixed_rows::<3>(0).into_owned());
    let translation = Vector3::new(params[3], params[4], params[5]);

    let mut res = SVector::<f64, 12>::zeros();
    for (i, model) in model_points().iter().enumerate() {
        let projected = project_point(&rotation, &translation, model, intrinsics)?;
        res[2 * i] = projected.x - image_points[i].x;
        res[2 * i + 1] = projected.y - image_points[i].y;
    }
    if res.iter().all(|v| v.is_finite()) {
        Some(res)
    } else {
        None
    }
}

/// Levenberg-Marquardt refinement from one seed. Returns the refined
/// parameters with the final squared-residual cost, or `None` when the seed
/// never produces finite residuals.
fn refine(
    seed: Vector6<f64>,
    image_points: &[Vector2<f64>; 6],
    intrinsics: &CameraIntrinsics,
) -> Option<(Vector6<f64>, f64)> {
    let mut params = seed;
    let mut res = residuals(&params, image_points, intrinsics)?;
    let mut cost = res.norm_squared();
    let mut damping = INITIAL_DAMPING;

    for _ in 0..MAX_ITERATIONS {
        // Central-difference Jacobian of the 12 residuals in the 6 parameters
        let mut jacobian = SMatrix::<f64, 12, 6>::zeros();
        for j in 0..6 {
            let step = 1e-6 * (1.0 + params[j].abs());
            let mut hi = params;
            hi[j] += step;
            let mut lo = params;
            lo[j] -= step;
            let r_hi = residuals(&hi, image_points, intrinsics)?;
            let r_lo = residuals(&lo, image_points, intrinsics)?;
            jacobian.set_column(j, &((r_hi - r_lo) / (2.0 * step)));
        }

        let jtj = jacobian.transpose() * jacobian;
        let jtr = jacobian.transpose() * res;

        let mut accepted = false;
        while damping < MAX_DAMPING {
            let mut damped = jtj;
            for d in 0..6 {
                damped[(d, d)] += damping * jtj[(d, d)].max(1e-12);
            }
            let Some(delta) = damped.lu().solve(&jtr) else {
                damping *= 10.0;
                continue;
            };
            let trial = params - delta;
            if let Some(trial_res) = residuals(&trial, image_points, intrinsics) {
                let trial_cost = trial_res.norm_squared();
                if trial_cost < cost {
                    let converged =
                        delta.norm() < 1e-10 || (cost - trial_cost) < 1e-12 * (cost + 1e-12);
                    params = trial;
                    res = trial_res;
                    cost = trial_cost;
                    damping = (damping * 0.3).max(1e-12);
                    accepted = true;
                    if converged {
                        return Some((params, cost));
                    }
                    break;
                }
            }
            damping *= 10.0;
        }

        if !accepted {
            break;
        }
    }

    cost.is_finite().then_some((params, cost))
}

/// Solve the head pose from the six pose landmarks in pixel coordinates.
///
/// Two canonical seeds are tried (a frontal and a flipped orientation, both
/// at a nominal depth) and the better converged solution wins. Returns `None`
/// when neither seed converges; the caller treats that as a neutral pose.
#[must_use]
pub fn solve_head_pose(
    image_points: &[Vector2<f64>; 6],
    intrinsics: &CameraIntrinsics,
) -> Option<HeadPose> {
    let seeds = [
        Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, INITIAL_DEPTH),
        Vector6::new(std::f64::consts::PI, 0.0, 0.0, 0.0, 0.0, INITIAL_DEPTH),
    ];

    let mut best: Option<(Vector6<f64>, f64)> = None;
    for seed in seeds {
        if let Some((params, cost)) = refine(seed, image_points, intrinsics) {
            if best.as_ref().map_or(true, |(_, c)| cost < *c) {
                best = Some((params, cost));
            }
        }
    }

    let (params, cost) = best?;
    // A pose whose reprojection error is still enormous never converged in
    // any useful sense.
    if cost > 1e6 {
        log::debug!("pose solve did not converge, residual cost {cost:.1}");
        return None;
    }

    let rotation = Rotation3::from_scaled_axis(params.fixed_rows::<3>(0).into_owned());
    Some(euler_yaw_pitch(&rotation))
}

/// Extract yaw and pitch in degrees from a rotation matrix.
///
/// `pitch = atan2(-R[2][0], sqrt(R[0][0]^2 + R[1][0]^2))`,
/// `yaw = atan2(R[2][1], R[2][2])`.
#[must_use]
pub fn euler_yaw_pitch(rotation: &Rotation3<f64>) -> HeadPose {
    let m = rotation.matrix();
    let sy = (m[(0, 0)].powi(2) + m[(1, 0)].powi(2)).sqrt();
    HeadPose {
        yaw_deg: m[(2, 1)].atan2(m[(2, 2)]).to_degrees(),
        pitch_deg: (-m[(2, 0)]).atan2(sy).to_degrees(),
    }
}
