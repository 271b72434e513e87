//! 워커별 필드 값 캐시
//!
//! 하나의 조건 트리에서 같은 필드를 여러 리프가 참조하더라도
//! 한 번의 평가 안에서는 문서를 한 번만 탐색하도록 결과를 슬롯에 보관합니다.
//!
//! 필드 경로는 트리 빌드 시 고유 경로마다 슬롯 번호를 받습니다([`FieldRef`]).
//! [`FieldScratch`]는 슬롯 배열이며 평가가 끝나면 버퍼를 유지한 채 비워집니다.
//!
//! 워커 ID를 아는 호출자는 [`FieldScratch`]를 직접 소유하고
//! [`Checker::check_with`](crate::Checker::check_with)를 쓰면 잠금이 전혀 없습니다.
//! 그 외에는 [`FieldValueCache`]가 proc ID별 스크래치를 지연 생성합니다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::field::{FieldPath, NodeKind, encoded_len, write_scalar};

/// 슬롯 번호가 부여된 필드 경로
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub(crate) path: FieldPath,
    pub(crate) slot: usize,
}

impl FieldRef {
    /// 필드 경로
    pub fn path(&self) -> &FieldPath {
        &self.path
    }
}

/// 한 필드의 탐색 결과
#[derive(Debug, Default)]
pub(crate) struct Slot {
    filled: bool,
    /// 배열/객체의 인코딩 길이를 계산해야 하는 슬롯인지 (트리 구조로 고정)
    wants_encoded_len: bool,
    pub(crate) kind: NodeKind,
    /// 스칼라의 바이트 표현
    pub(crate) bytes: Vec<u8>,
    pub(crate) array_len: usize,
    encoded_len: usize,
}

impl Slot {
    fn fill(&mut self, node: Option<&Value>) {
        self.kind = NodeKind::of(node);
        self.bytes.clear();
        self.array_len = 0;
        self.encoded_len = 0;

        match node {
            Some(arr @ Value::Array(items)) => {
                self.array_len = items.len();
                if self.wants_encoded_len {
                    self.encoded_len = encoded_len(arr);
                }
            }
            Some(obj @ Value::Object(_)) => {
                if self.wants_encoded_len {
                    self.encoded_len = encoded_len(obj);
                }
            }
            Some(scalar) => write_scalar(scalar, &mut self.bytes),
            None => {}
        }
        self.filled = true;
    }

    /// 매처에 넘길 값. null과 누락은 `None`입니다.
    pub(crate) fn scalar(&self) -> Option<&[u8]> {
        match self.kind {
            NodeKind::Absent | NodeKind::Null => None,
            _ => Some(&self.bytes),
        }
    }

    /// 바이트 길이. 누락된 필드는 `None`입니다.
    pub(crate) fn byte_len(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Absent => None,
            NodeKind::Null => Some(4),
            NodeKind::Array | NodeKind::Object => Some(self.encoded_len),
            NodeKind::Bool | NodeKind::Number | NodeKind::String => Some(self.bytes.len()),
        }
    }
}

/// 워커 하나의 슬롯 배열
#[derive(Debug, Default)]
pub struct FieldScratch {
    slots: Vec<Slot>,
    dig_count: u64,
}

impl FieldScratch {
    /// 빈 스크래치를 생성합니다. 첫 평가에서 트리에 맞게 크기가 정해집니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 슬롯 레이아웃을 트리에 맞춥니다.
    pub(crate) fn prepare(&mut self, layout: &[bool]) {
        if self.slots.len() != layout.len() {
            self.slots.resize_with(layout.len(), Slot::default);
        }
        for (slot, &wants) in self.slots.iter_mut().zip(layout) {
            slot.wants_encoded_len = wants;
        }
    }

    /// 모든 슬롯을 비웁니다. 버퍼 용량은 유지됩니다.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.filled = false;
        }
    }

    /// 필드 슬롯을 반환합니다. 이번 평가에서 처음이면 문서를 탐색합니다.
    pub(crate) fn slot(&mut self, field: &FieldRef, doc: &Value) -> &Slot {
        let slot = &mut self.slots[field.slot];
        if !slot.filled {
            self.dig_count += 1;
            slot.fill(field.path.dig(doc));
        }
        slot
    }

    /// 지금까지 문서를 탐색한 횟수
    pub fn dig_count(&self) -> u64 {
        self.dig_count
    }

    /// 슬롯 개수
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 슬롯이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// proc ID별 [`FieldScratch`] 저장소
///
/// 기존 워커의 스크래치는 읽기 잠금만으로 가져옵니다.
/// 쓰기 잠금은 처음 보는 proc ID에 대해서만 잡습니다.
#[derive(Debug, Default)]
pub struct FieldValueCache {
    workers: RwLock<HashMap<usize, Arc<Mutex<FieldScratch>>>>,
}

impl FieldValueCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// proc ID의 스크래치를 반환합니다. 없으면 생성합니다.
    pub fn scratch(&self, proc_id: usize) -> Arc<Mutex<FieldScratch>> {
        if let Some(scratch) = self.workers.read().get(&proc_id) {
            return Arc::clone(scratch);
        }

        let mut workers = self.workers.write();
        Arc::clone(workers.entry(proc_id).or_default())
    }

    /// 생성된 워커 스크래치 수
    pub fn worker_count(&self) -> usize {
        self.workers.read().len()
    }
}
