use chrono::{DateTime, Utc};

/// A timestamped event that can be bucketed and ranked.
///
/// Hosts implement this for their own row types so the aggregation functions
/// can work directly over a borrowed snapshot.
pub trait Record {
    fn created_at(&self) -> DateTime<Utc>;

    /// Category used for ranking. Records returning `None` are left out
    /// of rankings.
    fn category_label(&self) -> Option<&str>;
}

impl<R: Record + ?Sized> Record for &R {
    fn created_at(&self) -> DateTime<Utc> {
        (**self).created_at()
    }

    fn category_label(&self) -> Option<&str> {
        (**self).category_label()
    }
}
