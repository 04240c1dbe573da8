//! Domain entities: people, successors and layout-space geometry

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Stable identifier of a person within a board.
pub type NodeId = String;

/// 2D coordinate, used both for layout space and screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Width/height pair (viewport size in screen pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Hierarchy rank, ordered highest to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Executive,
    SeniorLeader,
    Manager,
    IndividualContributor,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Executive => "executive",
            Level::SeniorLeader => "senior-leader",
            Level::Manager => "manager",
            Level::IndividualContributor => "individual-contributor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessorType {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Time until a successor is ready, ordered soonest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Readiness {
    #[serde(rename = "0-3")]
    ZeroToThreeMonths,
    #[serde(rename = "3-6")]
    ThreeToSixMonths,
    #[serde(rename = "6-12")]
    SixToTwelveMonths,
    #[serde(rename = "12-24")]
    TwelveToTwentyFourMonths,
    #[serde(rename = "24+")]
    TwentyFourPlusMonths,
}

/// Candidate to succeed a person in their role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Successor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SuccessorType,
    pub priority: Priority,
    pub readiness: Readiness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_role: Option<String>,
}

/// A person record: one node of a board's reporting forest.
///
/// This is also the persisted, JSON-serializable representation.
/// `position` is `None` only before the first layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub team_size: u32,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reports_to: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default)]
    pub successors: Vec<Successor>,
}

impl Person {
    /// Minimal person without successors or position.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: String::new(),
            level,
            region: String::new(),
            country: String::new(),
            team_size: 0,
            risk_level: RiskLevel::default(),
            reports_to: None,
            position: None,
            successors: Vec::new(),
        }
    }

    pub fn reporting_to(mut self, manager: impl Into<NodeId>) -> Self {
        self.reports_to = Some(manager.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn located(mut self, region: impl Into<String>, country: impl Into<String>) -> Self {
        self.region = region.into();
        self.country = country.into();
        self
    }

    pub fn with_successor(mut self, successor: Successor) -> Self {
        self.successors.push(successor);
        self
    }

    /// No successor has been identified for this role.
    pub fn has_succession_gap(&self) -> bool {
        self.successors.is_empty()
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{} [{}]", self.name, self.id)
        } else {
            write!(f, "{} - {} [{}]", self.name, self.title, self.id)
        }
    }
}
