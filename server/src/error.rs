//! Rule-validation failures.
//!
//! Every variant is recoverable and leaves state untouched. The `Display`
//! text is what the client sees in `RESPONSE{success=false}`; it keeps the
//! game's Russian wording so existing clients show it unchanged.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Сначала подключитесь к игре")]
    NotJoined,
    #[error("Игра ещё не началась")]
    GameNotStarted,
    #[error("Игра уже началась")]
    GameAlreadyStarted,
    #[error("Игра окончена")]
    GameOver,
    #[error("Не ваш ход")]
    NotYourTurn,
    #[error("Архетип уже выбран")]
    ArchetypeAlreadyChosen,
    #[error("Место занято")]
    PlaceOccupied,
    #[error("Не хватает ресурсов")]
    InsufficientResources,
    #[error("Здание не найдено")]
    BuildingNotFound,
    #[error("Нельзя улучшить в тот же ход")]
    SameTurnUpgrade,
    #[error("Максимальный уровень")]
    MaxLevel,
    #[error("Некорректное количество")]
    InvalidCount,
    #[error("Лимит солдат за ход исчерпан")]
    SoldierLimitReached,
    #[error("Можно создать ещё {remaining} солдат в этот ход")]
    SoldierQuotaExceeded { remaining: u32 },
    #[error("Атака запрещена первые {peace_cycles} циклов")]
    AttacksDisabled { peace_cycles: u32 },
    #[error("Неверная цель")]
    InvalidTarget,
    #[error("Вы уже атаковали этого игрока в этот ход")]
    AlreadyAttacked,
    #[error("Недостаточно солдат")]
    NotEnoughSoldiers,
    #[error("Некорректный запрос")]
    MalformedRequest,
}
