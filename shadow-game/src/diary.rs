//! Daily diary of whispers drawn from a fixed flavor-text pool.
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const WHISPER_LINES: [&str; 15] = [
    "The shadows whisper secrets only you can hear...",
    "Tonight, the veil between worlds grows thin.",
    "Your shadow dances when you're not looking.",
    "The moon remembers your name.",
    "Something stirs in the darkness... it's friendly.",
    "The ghosts are throwing a party in your honor.",
    "Your courage lights candles in haunted halls.",
    "The night creatures speak well of you.",
    "Ancient magic flows through your fingertips.",
    "The stars have aligned for your adventure.",
    "Whispers in the wind carry your legend.",
    "The midnight hour holds no fear for you.",
    "Shadows gather to protect their companion.",
    "The full moon grants you mysterious powers.",
    "Echoes of forgotten spells surround you.",
];

/// Uniformly pick a whisper from the pool.
pub fn pick_whisper<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    WHISPER_LINES.choose(rng).copied().unwrap_or(WHISPER_LINES[0])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    pub date: NaiveDate,
    pub line: String,
    #[serde(default)]
    pub is_favorite: bool,
}

impl DiaryEntry {
    #[must_use]
    pub fn id_for(date: NaiveDate) -> String {
        format!("diary-{}", date.format("%Y-%m-%d"))
    }
}

/// Newest-first diary entries, at most one per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiaryLog {
    entries: Vec<DiaryEntry>,
}

impl DiaryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[DiaryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry_for(&self, date: NaiveDate) -> Option<&DiaryEntry> {
        self.entries.iter().find(|entry| entry.date == date)
    }

    /// The whisper already chosen for `date`, if the diary was opened that day.
    #[must_use]
    pub fn today_line(&self, today: NaiveDate) -> Option<&str> {
        self.entry_for(today).map(|entry| entry.line.as_str())
    }

    /// Return the entry for `today`, drawing a whisper the first time the
    /// day is seen. Later calls on the same day never redraw.
    pub fn open_today<R: Rng + ?Sized>(&mut self, today: NaiveDate, rng: &mut R) -> &DiaryEntry {
        let existing = self.entries.iter().position(|entry| entry.date == today);
        let index = if let Some(index) = existing {
            index
        } else {
            let line = pick_whisper(rng);
            log::debug!("diary entry created for {today}");
            let entry = DiaryEntry {
                id: DiaryEntry::id_for(today),
                date: today,
                line: line.to_string(),
                is_favorite: false,
            };
            let index = self
                .entries
                .iter()
                .position(|other| other.date < today)
                .unwrap_or(self.entries.len());
            self.entries.insert(index, entry);
            index
        };
        &self.entries[index]
    }

    /// Flip the favourite flag, returning the new value if `id` exists.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        entry.is_favorite = !entry.is_favorite;
        Some(entry.is_favorite)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &DiaryEntry> + '_ {
        self.entries.iter().filter(|entry| entry.is_favorite)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn one_entry_per_day_and_line_is_fixed() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut diary = DiaryLog::new();
        let first = diary.open_today(day(1), &mut rng).clone();
        for _ in 0..10 {
            let again = diary.open_today(day(1), &mut rng);
            assert_eq!(again, &first);
        }
        assert_eq!(diary.len(), 1);
        assert_eq!(diary.today_line(day(1)), Some(first.line.as_str()));
        assert!(WHISPER_LINES.contains(&first.line.as_str()));
        assert_eq!(first.id, "diary-2025-10-01");
    }

    #[test]
    fn entries_stay_newest_first() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut diary = DiaryLog::new();
        diary.open_today(day(2), &mut rng);
        diary.open_today(day(5), &mut rng);
        diary.open_today(day(3), &mut rng);
        let dates: Vec<_> = diary.entries().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(5), day(3), day(2)]);
        assert_eq!(diary.today_line(day(4)), None);
    }

    #[test]
    fn toggling_favorites() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut diary = DiaryLog::new();
        let id = diary.open_today(day(9), &mut rng).id.clone();
        assert_eq!(diary.toggle_favorite(&id), Some(true));
        assert_eq!(diary.favorites().count(), 1);
        assert_eq!(diary.toggle_favorite(&id), Some(false));
        assert_eq!(diary.favorites().count(), 0);
        assert_eq!(diary.toggle_favorite("diary-missing"), None);
    }

    #[test]
    fn whisper_pick_covers_pool() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            seen.insert(pick_whisper(&mut rng));
        }
        assert_eq!(seen.len(), WHISPER_LINES.len());
    }
}
