//! Skeleton-graph joint risk propagation
//!
//! Lower-limb joints are nodes of a fixed skeleton graph. Each scored joint
//! gets a local risk, instability is then passed along the kinematic chain
//! (hip to knee, then ankle to knee), and the summed risk is read out as a
//! 0-100 score together with the most loaded joint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::GraphError;

/// Skeleton nodes, in the fixed scoring order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Joint {
    #[serde(rename = "L_Hip")]
    LeftHip,
    #[serde(rename = "R_Hip")]
    RightHip,
    #[serde(rename = "L_Knee")]
    LeftKnee,
    #[serde(rename = "R_Knee")]
    RightKnee,
    #[serde(rename = "L_Ankle")]
    LeftAnkle,
    #[serde(rename = "R_Ankle")]
    RightAnkle,
    /// Upper-body proxy node; connected but never scored
    #[serde(rename = "L_Shoulder")]
    LeftShoulder,
    #[serde(rename = "R_Shoulder")]
    RightShoulder,
}

impl Joint {
    /// Joints that carry a risk value, in tie-break order
    pub const SCORED: [Joint; 6] = [
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Joint::LeftHip => "L_Hip",
            Joint::RightHip => "R_Hip",
            Joint::LeftKnee => "L_Knee",
            Joint::RightKnee => "R_Knee",
            Joint::LeftAnkle => "L_Ankle",
            Joint::RightAnkle => "R_Ankle",
            Joint::LeftShoulder => "L_Shoulder",
            Joint::RightShoulder => "R_Shoulder",
        }
    }

    /// Pose-landmark index used by the capture pipeline
    pub fn landmark_index(&self) -> u8 {
        match self {
            Joint::LeftHip => 11,
            Joint::RightHip => 12,
            Joint::LeftKnee => 13,
            Joint::RightKnee => 14,
            Joint::LeftAnkle => 15,
            Joint::RightAnkle => 16,
            Joint::LeftShoulder => 23,
            Joint::RightShoulder => 24,
        }
    }

    pub fn from_landmark_index(index: u8) -> Option<Joint> {
        match index {
            11 => Some(Joint::LeftHip),
            12 => Some(Joint::RightHip),
            13 => Some(Joint::LeftKnee),
            14 => Some(Joint::RightKnee),
            15 => Some(Joint::LeftAnkle),
            16 => Some(Joint::RightAnkle),
            23 => Some(Joint::LeftShoulder),
            24 => Some(Joint::RightShoulder),
            _ => None,
        }
    }

    fn initial_risk(&self) -> f64 {
        match self {
            Joint::LeftHip | Joint::RightHip => HIP_BASE_RISK,
            Joint::LeftAnkle | Joint::RightAnkle => ANKLE_BASE_RISK,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Bones of the skeleton graph (undirected)
pub const SKELETON_EDGES: [(Joint, Joint); 8] = [
    (Joint::LeftHip, Joint::LeftKnee),
    (Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightHip, Joint::RightKnee),
    (Joint::RightKnee, Joint::RightAnkle),
    (Joint::LeftHip, Joint::RightHip),
    (Joint::LeftShoulder, Joint::RightShoulder),
    (Joint::LeftHip, Joint::LeftShoulder),
    (Joint::RightHip, Joint::RightShoulder),
];

/// Message-passing rounds as (source, target, weight); each round reads the
/// risks left by the previous one
const PROPAGATION_PASSES: [[(Joint, Joint, f64); 2]; 2] = [
    // Downstream kinematic chain
    [
        (Joint::LeftHip, Joint::LeftKnee, 0.5),
        (Joint::RightHip, Joint::RightKnee, 0.5),
    ],
    // Upstream ground reaction
    [
        (Joint::LeftAnkle, Joint::LeftKnee, 0.4),
        (Joint::RightAnkle, Joint::RightKnee, 0.4),
    ],
];

const HIP_BASE_RISK: f64 = 0.1;
const ANKLE_BASE_RISK: f64 = 0.3;
const KNEE_FAULT_RISK: f64 = 1.0;
const KNEE_SOUND_RISK: f64 = 0.2;
/// Degrees of deviation from a straight leg tolerated before a knee is flagged
const KNEE_DEVIATION_LIMIT: f64 = 15.0;
const SCORE_SCALE: f64 = 15.0;

/// One pose landmark in capture coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Keypoint { x, y, z }
    }
}

pub type KeypointSet = BTreeMap<Joint, Keypoint>;

/// Joint-angle geometry used for the knee embedding
pub trait AngleEstimator: Send + Sync + fmt::Debug {
    /// Angle at `b` in degrees formed by the segments to `a` and `c`
    fn angle(&self, a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f64;

    fn name(&self) -> &'static str;
}

/// Fixed 170 degree reading used until real pose capture is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAngle;

impl PlaceholderAngle {
    pub const DEGREES: f64 = 170.0;
}

impl AngleEstimator for PlaceholderAngle {
    fn angle(&self, _a: &Keypoint, _b: &Keypoint, _c: &Keypoint) -> f64 {
        Self::DEGREES
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// Geometric angle between `a - b` and `c - b`
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorAngle;

impl AngleEstimator for VectorAngle {
    fn angle(&self, a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f64 {
        let u = [a.x - b.x, a.y - b.y, a.z - b.z];
        let v = [c.x - b.x, c.y - b.y, c.z - b.z];

        let norm_u = u.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_v = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_u == 0.0 || norm_v == 0.0 {
            return 0.0;
        }

        let dot: f64 = u.iter().zip(v.iter()).map(|(p, q)| p * q).sum();
        (dot / (norm_u * norm_v)).clamp(-1.0, 1.0).acos().to_degrees()
    }

    fn name(&self) -> &'static str {
        "vector"
    }
}

/// Readout of one propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRisk {
    #[serde(alias = "gnn_active")]
    pub active: bool,

    /// Whole-skeleton risk (0-100, 1 dp)
    pub risk_score: f64,

    /// Most loaded joint id, or "None" when inactive
    pub critical_joint: String,

    /// Per-joint accumulated risk (2 dp)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_weights: BTreeMap<Joint, f64>,

    pub relations: Vec<String>,
}

impl GraphRisk {
    /// Result for an empty skeleton, also the neutral fallback
    pub fn inactive() -> Self {
        GraphRisk {
            active: false,
            risk_score: 0.0,
            critical_joint: "None".to_string(),
            node_weights: BTreeMap::new(),
            relations: Vec::new(),
        }
    }
}

impl Default for GraphRisk {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Skeleton graph scorer
#[derive(Debug)]
pub struct BiomechanicsGraph {
    estimator: Box<dyn AngleEstimator>,
}

impl BiomechanicsGraph {
    pub fn new() -> Self {
        Self::with_estimator(Box::new(PlaceholderAngle))
    }

    pub fn with_estimator(estimator: Box<dyn AngleEstimator>) -> Self {
        BiomechanicsGraph { estimator }
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Zero-coordinate skeleton used when no pose capture is available
    pub fn placeholder_keypoints() -> KeypointSet {
        Joint::SCORED
            .iter()
            .map(|&joint| (joint, Keypoint::default()))
            .collect()
    }

    /// Score a skeleton; an empty set yields [`GraphRisk::inactive`]
    pub fn propagate(&self, keypoints: &KeypointSet) -> Result<GraphRisk, GraphError> {
        if keypoints.is_empty() {
            return Ok(GraphRisk::inactive());
        }

        let point = |joint: Joint| {
            keypoints.get(&joint).ok_or_else(|| GraphError::MissingJoint {
                joint: joint.id().to_string(),
            })
        };
        for joint in Joint::SCORED {
            point(joint)?;
        }

        let mut risk: BTreeMap<Joint, f64> = Joint::SCORED
            .iter()
            .map(|&joint| (joint, joint.initial_risk()))
            .collect();

        for (hip, knee, ankle) in [
            (Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle),
            (Joint::RightHip, Joint::RightKnee, Joint::RightAnkle),
        ] {
            let angle = self
                .estimator
                .angle(point(hip)?, point(knee)?, point(ankle)?);
            if !angle.is_finite() {
                return Err(GraphError::InvalidAngle {
                    joint: knee.id().to_string(),
                    value: angle,
                });
            }
            let knee_risk = if (180.0 - angle).abs() > KNEE_DEVIATION_LIMIT {
                KNEE_FAULT_RISK
            } else {
                KNEE_SOUND_RISK
            };
            risk.insert(knee, knee_risk);
        }

        for pass in PROPAGATION_PASSES {
            for (source, target, weight) in pass {
                let message = risk.get(&source).copied().unwrap_or(0.0) * weight;
                *risk.entry(target).or_insert(0.0) += message;
            }
        }

        let total: f64 = risk.values().sum();
        let risk_score = round_to((total * SCORE_SCALE).clamp(0.0, 100.0), 1);

        // First joint in scoring order wins ties
        let mut critical = Joint::SCORED[0];
        for joint in Joint::SCORED {
            if risk[&joint] > risk[&critical] {
                critical = joint;
            }
        }

        let hip_share = (risk[&Joint::LeftHip] * 30.0).round() as i64;
        let relations = vec![
            format!("Hip Instability contributing {}% to Knee Load", hip_share),
            format!("Ground Reaction Force amplifying {} stress", critical),
        ];

        debug!(
            estimator = self.estimator.name(),
            risk_score,
            critical_joint = %critical,
            "Skeleton propagated"
        );

        Ok(GraphRisk {
            active: true,
            risk_score,
            critical_joint: critical.id().to_string(),
            node_weights: risk
                .into_iter()
                .map(|(joint, value)| (joint, round_to(value, 2)))
                .collect(),
            relations,
        })
    }
}

impl Default for BiomechanicsGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
