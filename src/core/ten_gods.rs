use crate::core::elements::{lookup_stem, relation};
use crate::domain::model::{Relation, TenGod};

/// 以日主天干為基準，判定目標天干的十神。
///
/// 兩個字元都必須是天干；地支需先換成本氣藏干再呼叫。
pub fn classify(day_master: &str, target: &str) -> TenGod {
    let (Some(master), Some(other)) = (lookup_stem(day_master), lookup_stem(target)) else {
        return TenGod::Unknown;
    };

    let same_polarity = master.polarity == other.polarity;
    match (relation(master.element, other.element), same_polarity) {
        (Relation::Same, true) => TenGod::Friend,
        (Relation::Same, false) => TenGod::RobWealth,
        (Relation::Generates, true) => TenGod::EatingGod,
        (Relation::Generates, false) => TenGod::HurtingOfficer,
        (Relation::GeneratedBy, true) => TenGod::IndirectResource,
        (Relation::GeneratedBy, false) => TenGod::DirectResource,
        (Relation::Controls, true) => TenGod::IndirectWealth,
        (Relation::Controls, false) => TenGod::DirectWealth,
        (Relation::ControlledBy, true) => TenGod::SevenKillings,
        (Relation::ControlledBy, false) => TenGod::DirectOfficer,
        (Relation::Unknown, _) => TenGod::Unknown,
    }
}
