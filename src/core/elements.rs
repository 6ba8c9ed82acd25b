//! # 五行與陰陽
//!
//! 十天干、十二地支的固定對照表，以及五行生剋關係。
//!
//! - 天干: 甲 乙 丙 丁 戊 己 庚 辛 壬 癸
//! - 地支: 子 丑 寅 卯 辰 巳 午 未 申 酉 戌 亥

use crate::domain::model::{BranchEntry, Element, Polarity, Relation, StemEntry, Symbol};

const fn stem(raw: char, name: &'static str, element: Element, polarity: Polarity) -> StemEntry {
    StemEntry {
        raw,
        name,
        element,
        polarity,
    }
}

const fn branch(
    raw: char,
    name: &'static str,
    element: Element,
    polarity: Polarity,
    main_stem: char,
) -> BranchEntry {
    BranchEntry {
        raw,
        name,
        element,
        polarity,
        main_stem,
    }
}

pub const STEMS: [StemEntry; 10] = [
    stem('甲', "Jia", Element::Wood, Polarity::Yang),
    stem('乙', "Yi", Element::Wood, Polarity::Yin),
    stem('丙', "Bing", Element::Fire, Polarity::Yang),
    stem('丁', "Ding", Element::Fire, Polarity::Yin),
    stem('戊', "Wu", Element::Earth, Polarity::Yang),
    stem('己', "Ji", Element::Earth, Polarity::Yin),
    stem('庚', "Geng", Element::Metal, Polarity::Yang),
    stem('辛', "Xin", Element::Metal, Polarity::Yin),
    stem('壬', "Ren", Element::Water, Polarity::Yang),
    stem('癸', "Gui", Element::Water, Polarity::Yin),
];

/// 地支表；最後一欄為藏干本氣
pub const BRANCHES: [BranchEntry; 12] = [
    branch('子', "Zi", Element::Water, Polarity::Yang, '癸'),
    branch('丑', "Chou", Element::Earth, Polarity::Yin, '己'),
    branch('寅', "Yin", Element::Wood, Polarity::Yang, '甲'),
    branch('卯', "Mao", Element::Wood, Polarity::Yin, '乙'),
    branch('辰', "Chen", Element::Earth, Polarity::Yang, '戊'),
    branch('巳', "Si", Element::Fire, Polarity::Yin, '丙'),
    branch('午', "Wu", Element::Fire, Polarity::Yang, '丁'),
    branch('未', "Wei", Element::Earth, Polarity::Yin, '己'),
    branch('申', "Shen", Element::Metal, Polarity::Yang, '庚'),
    branch('酉', "You", Element::Metal, Polarity::Yin, '辛'),
    branch('戌', "Xu", Element::Earth, Polarity::Yang, '戊'),
    branch('亥', "Hai", Element::Water, Polarity::Yin, '壬'),
];

/// 地支六冲：子午、丑未、寅申、卯酉、辰戌、巳亥
const BRANCH_CLASH_PAIRS: [(char, char); 6] = [
    ('子', '午'),
    ('丑', '未'),
    ('寅', '申'),
    ('卯', '酉'),
    ('辰', '戌'),
    ('巳', '亥'),
];

/// 地支六合：子丑、寅亥、卯戌、辰酉、巳申、午未
const BRANCH_HARMONY_PAIRS: [(char, char); 6] = [
    ('子', '丑'),
    ('寅', '亥'),
    ('卯', '戌'),
    ('辰', '酉'),
    ('巳', '申'),
    ('午', '未'),
];

/// 天干五合：甲己、乙庚、丙辛、丁壬、戊癸
const STEM_UNION_PAIRS: [(char, char); 5] = [
    ('甲', '己'),
    ('乙', '庚'),
    ('丙', '辛'),
    ('丁', '壬'),
    ('戊', '癸'),
];

fn single_char(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

pub fn stem_entry(raw: char) -> Option<&'static StemEntry> {
    STEMS.iter().find(|s| s.raw == raw)
}

pub fn branch_entry(raw: char) -> Option<&'static BranchEntry> {
    BRANCHES.iter().find(|b| b.raw == raw)
}

pub fn lookup_stem(raw: &str) -> Option<&'static StemEntry> {
    single_char(raw).and_then(stem_entry)
}

pub fn lookup_branch(raw: &str) -> Option<&'static BranchEntry> {
    single_char(raw).and_then(branch_entry)
}

fn unrecognized(raw: &str) -> Symbol {
    Symbol {
        raw: raw.to_string(),
        name: raw.to_string(),
        element: Element::Unknown,
        polarity: None,
    }
}

pub fn stem_symbol(raw: &str) -> Symbol {
    match lookup_stem(raw) {
        Some(entry) => Symbol {
            raw: entry.raw.to_string(),
            name: entry.name.to_string(),
            element: entry.element,
            polarity: Some(entry.polarity),
        },
        None => unrecognized(raw),
    }
}

pub fn branch_symbol(raw: &str) -> Symbol {
    match lookup_branch(raw) {
        Some(entry) => Symbol {
            raw: entry.raw.to_string(),
            name: entry.name.to_string(),
            element: entry.element,
            polarity: Some(entry.polarity),
        },
        None => unrecognized(raw),
    }
}

/// 計算 A 對 B 的五行關係
pub fn relation(a: Element, b: Element) -> Relation {
    let (Some(i), Some(j)) = (a.cycle_index(), b.cycle_index()) else {
        return Relation::Unknown;
    };

    if i == j {
        Relation::Same
    } else if (i + 1) % 5 == j {
        Relation::Generates
    } else if (j + 1) % 5 == i {
        Relation::GeneratedBy
    } else if (i + 2) % 5 == j {
        Relation::Controls
    } else if (j + 2) % 5 == i {
        Relation::ControlledBy
    } else {
        // 五元素環上任兩點的距離只能是 0、±1、±2
        Relation::Unknown
    }
}

fn is_pair(pairs: &[(char, char)], a: &str, b: &str) -> bool {
    let (Some(a), Some(b)) = (single_char(a), single_char(b)) else {
        return false;
    };
    pairs
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

pub fn is_branch_clash(a: &str, b: &str) -> bool {
    is_pair(&BRANCH_CLASH_PAIRS, a, b)
}

pub fn is_branch_harmony(a: &str, b: &str) -> bool {
    is_pair(&BRANCH_HARMONY_PAIRS, a, b)
}

pub fn is_stem_union(a: &str, b: &str) -> bool {
    is_pair(&STEM_UNION_PAIRS, a, b)
}
