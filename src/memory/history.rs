//! 运行历史：只追加的 Turn 序列
//!
//! 由引擎独占，单次运行内单调增长；不提供删除或修改接口，
//! 因此同一前缀重放给决策服务时结果可复现。

use serde::Serialize;

use crate::memory::Turn;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一条种子 Turn 开始的历史
    pub fn seeded(seed: Turn) -> Self {
        Self { turns: vec![seed] }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn latest(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
