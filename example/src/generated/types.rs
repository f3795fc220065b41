// Generated by bhelium 0.1.0 for namespace `example`. Do not edit.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    #[serde(rename = "FLAT")]
    Flat,
    #[serde(rename = "ROUND")]
    Round,
    #[serde(rename = "POINTED")]
    Pointed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    #[serde(rename = "HAPPY")]
    Happy,
    #[serde(rename = "GRUMPY")]
    Grumpy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

pub const REFRESH: &str = "1m 30s";

pub const REFRESH_MS: i64 = 90000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Example {
    #[serde(rename = "clientID")]
    pub client_id: u32,
    pub shape: Shape,
    pub colors: Vec<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<ExampleExtra>,
    pub id: u64,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExampleExtra {
    #[serde(rename = "note")]
    Note(String),
    #[serde(rename = "color")]
    Color(Box<Color>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ack {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
