/*!
 * Security context extractors
 *
 * Responsibility:
 * - access middleware が request extensions に入れた SecurityContext を handler に渡す
 * - 型そのものは services::auth::context 側で定義する
 *
 * Public API:
 * - Security     (匿名も可)
 * - CurrentUser  (認証必須、なければ 401)
 */

mod core;

pub use self::core::{CurrentUser, Security};
pub use crate::services::auth::context::{Principal, SecurityContext};
