//! Navigation and view switching utilities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    #[default]
    Dashboard,
    Feeds,
    Articles,
    Excerpts,
    System,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "仪表板",
            View::Feeds => "订阅源",
            View::Articles => "文章",
            View::Excerpts => "摘录",
            View::System => "系统",
        }
    }

    pub fn all() -> &'static [View] {
        &[
            View::Dashboard,
            View::Feeds,
            View::Articles,
            View::Excerpts,
            View::System,
        ]
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<View> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> View {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn previous(&self) -> View {
        let idx = self.index();
        let all = Self::all();
        let prev = if idx == 0 { all.len() - 1 } else { idx - 1 };
        all[prev]
    }
}
