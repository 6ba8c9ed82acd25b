use crate::domain::model::Location;
use crate::domain::ports::LocationResolver;
use crate::utils::error::{BaziError, Result};
use crate::utils::validation::validate_range;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone)]
struct LocationRecord {
    location: Location,
    aliases: Vec<String>,
}

impl LocationRecord {
    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.location.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    aliases: Option<String>,
}

/// (名稱, 緯度, 經度, 別名)
const BUILTIN_LOCATIONS: &[(&str, f64, f64, &[&str])] = &[
    ("Beijing", 39.9042, 116.4074, &["北京", "北京市", "Peking"]),
    ("Shanghai", 31.2304, 121.4737, &["上海", "上海市"]),
    ("Guangzhou", 23.1291, 113.2644, &["广州", "廣州", "Canton"]),
    ("Shenzhen", 22.5431, 114.0579, &["深圳"]),
    ("Chengdu", 30.5728, 104.0668, &["成都"]),
    ("Chongqing", 29.5630, 106.5516, &["重庆", "重慶"]),
    ("Wuhan", 30.5928, 114.3055, &["武汉", "武漢"]),
    ("Xi'an", 34.3416, 108.9398, &["西安", "Xian"]),
    ("Hangzhou", 30.2741, 120.1551, &["杭州"]),
    ("Nanjing", 32.0603, 118.7969, &["南京"]),
    ("Tianjin", 39.3434, 117.3616, &["天津"]),
    ("Harbin", 45.8038, 126.5350, &["哈尔滨", "哈爾濱"]),
    ("Urumqi", 43.8256, 87.6168, &["乌鲁木齐", "烏魯木齊"]),
    ("Lhasa", 29.6520, 91.1721, &["拉萨", "拉薩"]),
    ("Kunming", 25.0389, 102.7183, &["昆明"]),
    ("Hong Kong", 22.3193, 114.1694, &["香港"]),
    ("Macau", 22.1987, 113.5439, &["澳门", "澳門"]),
    ("Taipei", 25.0330, 121.5654, &["台北", "臺北"]),
    ("Singapore", 1.3521, 103.8198, &["新加坡"]),
    ("Kuala Lumpur", 3.1390, 101.6869, &["吉隆坡"]),
    ("Tokyo", 35.6762, 139.6503, &["东京", "東京"]),
    ("Seoul", 37.5665, 126.9780, &["首尔", "首爾"]),
    ("London", 51.5074, -0.1278, &["伦敦", "倫敦"]),
    ("New York", 40.7128, -74.0060, &["纽约", "紐約", "NYC"]),
    ("Los Angeles", 34.0522, -118.2437, &["洛杉矶", "洛杉磯"]),
    ("San Francisco", 37.7749, -122.4194, &["旧金山", "舊金山"]),
    ("Vancouver", 49.2827, -123.1207, &["温哥华", "溫哥華"]),
    ("Sydney", -33.8688, 151.2093, &["悉尼", "雪梨"]),
];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 地名 → 經緯度的查表服務
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    records: Vec<LocationRecord>,
}

impl LocationTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let records = BUILTIN_LOCATIONS
            .iter()
            .map(|(name, latitude, longitude, aliases)| LocationRecord {
                location: Location {
                    name: name.to_string(),
                    latitude: *latitude,
                    longitude: *longitude,
                },
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            })
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, location: Location, aliases: Vec<String>) {
        self.records
            .retain(|r| normalize(&r.location.name) != normalize(&location.name));
        self.records.push(LocationRecord { location, aliases });
    }

    /// 讀取 `name,latitude,longitude,aliases` 格式的 CSV；別名以 `|` 分隔
    pub fn extend_from_csv<R: std::io::Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut added = 0;

        for row in csv_reader.deserialize::<CsvRow>() {
            let row = row?;
            if row.name.is_empty() {
                return Err(BaziError::LocationError {
                    message: "location row has an empty name".to_string(),
                });
            }
            validate_range("latitude", row.latitude, -90.0, 90.0)?;
            validate_range("longitude", row.longitude, -180.0, 180.0)?;

            let aliases = row
                .aliases
                .map(|a| {
                    a.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            self.insert(
                Location {
                    name: row.name,
                    latitude: row.latitude,
                    longitude: row.longitude,
                },
                aliases,
            );
            added += 1;
        }

        tracing::debug!("Loaded {} locations from CSV", added);
        Ok(added)
    }

    pub fn extend_from_csv_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let file = std::fs::File::open(path)?;
        self.extend_from_csv(file)
    }
}

impl LocationResolver for LocationTable {
    /// 先比對完整名稱或別名，否則取查詢字串中包含的最長地名（例如「北京市朝阳区」→ 北京市）
    fn resolve(&self, query: &str) -> Option<Location> {
        let query = normalize(query);
        if query.is_empty() {
            return None;
        }

        if let Some(record) = self
            .records
            .iter()
            .find(|r| r.names().any(|n| normalize(n) == query))
        {
            return Some(record.location.clone());
        }

        self.records
            .iter()
            .flat_map(|r| r.names().map(move |n| (normalize(n), r)))
            .filter(|(name, _)| !name.is_empty() && query.contains(name.as_str()))
            .max_by_key(|(name, _)| name.chars().count())
            .map(|(_, r)| r.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin_names_and_aliases() {
        let table = LocationTable::builtin();
        assert_eq!(table.resolve("beijing").unwrap().name, "Beijing");
        assert_eq!(table.resolve(" 北京 ").unwrap().name, "Beijing");
        assert_eq!(table.resolve("Hong Kong").unwrap().longitude, 114.1694);
    }

    #[test]
    fn test_resolve_contained_name() {
        let table = LocationTable::builtin();
        assert_eq!(table.resolve("北京市朝阳区").unwrap().name, "Beijing");
        assert_eq!(table.resolve("Pudong, Shanghai, China").unwrap().name, "Shanghai");
    }

    #[test]
    fn test_unresolved_location() {
        let table = LocationTable::builtin();
        assert!(table.resolve("Atlantis").is_none());
        assert!(table.resolve("   ").is_none());
        assert!(LocationTable::empty().resolve("Beijing").is_none());
    }

    #[test]
    fn test_extend_from_csv() {
        let csv = "name,latitude,longitude,aliases\nQingdao,36.0671,120.3826,青岛|青島\nBeijing,39.9,116.4,\n";
        let mut table = LocationTable::builtin();
        let before = table.len();

        assert_eq!(table.extend_from_csv(csv.as_bytes()).unwrap(), 2);
        assert_eq!(table.len(), before + 1);
        assert_eq!(table.resolve("青岛").unwrap().name, "Qingdao");
        assert_eq!(table.resolve("Beijing").unwrap().longitude, 116.4);
    }

    #[test]
    fn test_extend_from_csv_rejects_bad_coordinates() {
        let csv = "name,latitude,longitude,aliases\nNowhere,95.0,10.0,\n";
        assert!(LocationTable::empty().extend_from_csv(csv.as_bytes()).is_err());
    }
}
