//! Logship Antispam -- 소스별 유입 제한
//!
//! 유지보수 주기당 소스별 이벤트 수를 세어 임계값을 넘은 소스를 차단합니다.
//! 차단은 히스테리시스를 가지며 `unban_iterations`번의 유지보수 sweep 후 해제됩니다.
//!
//! 예외 규칙은 원시 바이트 모드의 [`logship_doif::Checker`]로 표현되며,
//! 이벤트 본문, 소스 이름, 메타데이터 값 중 하나에 적용됩니다.
//!
//! # 사용 예시
//!
//! ```
//! use std::collections::HashMap;
//! use chrono::Utc;
//! use logship_antispam::{Antispammer, GuardConfigBuilder};
//!
//! let config = GuardConfigBuilder::new().threshold(100).build().unwrap();
//! let guard = Antispammer::new(&config).unwrap();
//!
//! let spam = guard.is_spam(0, "/var/log/app.log", false, b"{}", Utc::now(), &HashMap::new());
//! assert!(!spam);
//!
//! // 유지보수 루프에서 주기적으로 호출
//! guard.maintenance();
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod rule;

pub use config::{GuardConfig, GuardConfigBuilder};
pub use error::AntispamError;
pub use guard::Antispammer;
pub use rule::{ExceptionRule, RuleTarget, Threshold};
