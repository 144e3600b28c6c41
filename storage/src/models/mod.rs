mod turn_record;

pub use turn_record::ConversationTurnRecord;
