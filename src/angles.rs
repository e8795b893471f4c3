use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight joints whose angles drive rep counting and feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl Joint {
    pub const COUNT: usize = 8;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    /// Identifier used in reports and logs
    pub fn name(&self) -> &'static str {
        match self {
            Joint::LeftElbow => "leftElbow",
            Joint::RightElbow => "rightElbow",
            Joint::LeftShoulder => "leftShoulder",
            Joint::RightShoulder => "rightShoulder",
            Joint::LeftHip => "leftHip",
            Joint::RightHip => "rightHip",
            Joint::LeftKnee => "leftKnee",
            Joint::RightKnee => "rightKnee",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A left/right joint pair, e.g. both elbows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointPair {
    pub left: Joint,
    pub right: Joint,
}

impl JointPair {
    pub const ELBOWS: JointPair = JointPair::new(Joint::LeftElbow, Joint::RightElbow);
    pub const SHOULDERS: JointPair = JointPair::new(Joint::LeftShoulder, Joint::RightShoulder);
    pub const HIPS: JointPair = JointPair::new(Joint::LeftHip, Joint::RightHip);
    pub const KNEES: JointPair = JointPair::new(Joint::LeftKnee, Joint::RightKnee);

    pub const fn new(left: Joint, right: Joint) -> Self {
        Self { left, right }
    }
}

/// Angles in degrees for every [`Joint`], produced once per frame
///
/// A joint whose geometry collapsed has no angle. Undetermined joints never
/// count as 0°: pair averages, asymmetry and everything built on them treat
/// the pair as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleSet {
    values: [Option<f32>; Joint::COUNT],
}

impl AngleSet {
    /// Build from a closure evaluated once per joint
    pub fn from_fn<F: FnMut(Joint) -> Option<f32>>(mut f: F) -> Self {
        let mut values = [None; Joint::COUNT];
        for joint in Joint::ALL {
            values[joint.slot()] = f(joint);
        }
        Self { values }
    }

    /// Same angle for every joint
    pub fn uniform(angle: f32) -> Self {
        Self {
            values: [Some(angle); Joint::COUNT],
        }
    }

    /// Copy with one joint replaced
    pub fn with(mut self, joint: Joint, angle: f32) -> Self {
        self.values[joint.slot()] = Some(angle);
        self
    }

    /// Copy with one joint marked undetermined
    pub fn without(mut self, joint: Joint) -> Self {
        self.values[joint.slot()] = None;
        self
    }

    pub fn get(&self, joint: Joint) -> Option<f32> {
        self.values[joint.slot()]
    }

    /// Mean of a left/right pair, `None` unless both sides are known
    pub fn average(&self, pair: JointPair) -> Option<f32> {
        Some((self.get(pair.left)? + self.get(pair.right)?) / 2.0)
    }

    /// Absolute left/right difference, `None` unless both sides are known
    pub fn asymmetry(&self, pair: JointPair) -> Option<f32> {
        Some((self.get(pair.right)? - self.get(pair.left)?).abs())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, Option<f32>)> + '_ {
        Joint::ALL.iter().map(move |&joint| (joint, self.get(joint)))
    }

    /// Joints whose angle could not be determined (degenerate geometry)
    pub fn undetermined(&self) -> impl Iterator<Item = Joint> + '_ {
        self.iter()
            .filter(|(_, angle)| angle.is_none())
            .map(|(joint, _)| joint)
    }
}

impl Serialize for AngleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Joint::COUNT))?;
        for (joint, angle) in self.iter() {
            map.serialize_entry(joint.name(), &angle)?;
        }
        map.end()
    }
}
