//! Built-in registry of news publishers and their topic feeds.

use crate::feed::Source;
use crate::{Error, Result};

/// One feed a publisher offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedEntry {
    pub key: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
}

/// A publisher with a fixed table of feeds and topic aliases
#[derive(Debug)]
pub struct Publisher {
    pub id: &'static str,
    pub brand: &'static str,
    pub base_url: &'static str,
    pub default_feed: &'static str,
    pub feeds: &'static [FeedEntry],
    /// Topic phrase (lowercase) to feed key
    pub aliases: &'static [(&'static str, &'static str)],
    /// Other names the publisher answers to
    pub names: &'static [&'static str],
}

impl Publisher {
    /// Exact feed-key lookup
    pub fn feed(&self, key: &str) -> Option<&'static FeedEntry> {
        self.feeds.iter().find(|f| f.key == key)
    }

    pub fn default_entry(&self) -> Option<&'static FeedEntry> {
        self.feed(self.default_feed)
    }

    /// Resolve a free-text topic to one feed.
    ///
    /// Aliases are tried first, then feed keys (case-insensitive), and
    /// finally the publisher's default feed.
    pub fn resolve(&self, topic: &str) -> Option<&'static FeedEntry> {
        let phrase = topic.trim().to_lowercase();
        if phrase.is_empty() {
            return self.default_entry();
        }

        self.match_alias(&phrase)
            .or_else(|| self.match_key(&phrase))
            .and_then(|key| self.feed(key))
            .or_else(|| self.default_entry())
    }

    fn match_alias(&self, phrase: &str) -> Option<&'static str> {
        if let Some((_, key)) = self.aliases.iter().find(|(alias, _)| *alias == phrase) {
            return Some(*key);
        }

        // Longest alias wins; on equal length, the one later in the phrase
        let words: Vec<&str> = phrase.split_whitespace().collect();
        self.aliases
            .iter()
            .filter_map(|(alias, key)| {
                let position = alias_position(&words, alias)?;
                Some((alias.chars().count(), position, *key))
            })
            .max_by_key(|&(len, position, _)| (len, position))
            .map(|(_, _, key)| key)
    }

    fn match_key(&self, phrase: &str) -> Option<&'static str> {
        let compact: String = phrase.split_whitespace().collect();
        self.feeds
            .iter()
            .find(|f| {
                f.key.eq_ignore_ascii_case(&compact)
                    || phrase.split_whitespace().any(|t| f.key.eq_ignore_ascii_case(t))
            })
            .map(|f| f.key)
    }

    pub fn feed_url(&self, feed: &FeedEntry) -> String {
        format!("{}{}", self.base_url, feed.slug)
    }

    /// Source descriptor for one of this publisher's feeds
    pub fn source(&self, feed: &FeedEntry) -> Source {
        Source::new(self.feed_url(feed))
            .with_name(Some(format!("{} {}", self.brand, feed.key)))
            .with_tags(vec![self.id.to_string(), feed.key.to_string()])
    }

    fn answers_to(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name) || self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// Index of the last word at which `alias` occurs in `words`.
/// ASCII aliases must match whole words; Hangul ones may carry a
/// particle suffix ("경제는").
fn alias_position(words: &[&str], alias: &str) -> Option<usize> {
    if alias.is_ascii() {
        let alias_words: Vec<&str> = alias.split_whitespace().collect();
        if alias_words.is_empty() {
            return None;
        }
        words.windows(alias_words.len()).rposition(|w| w == alias_words.as_slice())
    } else {
        words.iter().rposition(|w| w.starts_with(alias))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeedCatalog {
    publishers: &'static [Publisher],
}

impl Default for FeedCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FeedCatalog {
    pub fn builtin() -> Self {
        Self { publishers: PUBLISHERS }
    }

    pub fn publishers(&self) -> &'static [Publisher] {
        self.publishers
    }

    /// Find a publisher by id or one of its alternate names
    pub fn publisher(&self, name: &str) -> Option<&'static Publisher> {
        let name = name.trim();
        self.publishers.iter().find(|p| p.answers_to(name))
    }

    /// Resolve a publisher and topic phrase to a fetchable source
    pub fn resolve(&self, publisher: &str, topic: &str) -> Result<Source> {
        let publisher = self
            .publisher(publisher)
            .ok_or_else(|| Error::InvalidSource(format!("Unknown publisher: {}", publisher)))?;
        let feed = publisher.resolve(topic).ok_or_else(|| {
            Error::Other(format!("Publisher '{}' has no default feed", publisher.id))
        })?;

        tracing::debug!("Resolved topic {:?} to {} {}", topic, publisher.id, feed.key);
        Ok(publisher.source(feed))
    }
}

const fn feed(key: &'static str, slug: &'static str, description: &'static str) -> FeedEntry {
    FeedEntry { key, slug, description }
}

static PUBLISHERS: &[Publisher] = &[
    Publisher {
        id: "america",
        brand: "The New York Times",
        base_url: "https://rss.nytimes.com/services/xml/rss/nyt/",
        default_feed: "HomePage",
        names: &["us", "usa", "nyt", "미국", "뉴욕타임즈"],
        feeds: &[
            feed("HomePage", "HomePage.xml", "Top stories across all sections"),
            feed("World", "World.xml", "International news and regional conflicts"),
            feed("US", "US.xml", "US national, state and local news"),
            feed("Politics", "Politics.xml", "White House, Congress and elections"),
            feed("Business", "Business.xml", "Business, markets and companies"),
            feed("Economy", "Economy.xml", "Macroeconomics, jobs and inflation"),
            feed("Technology", "Technology.xml", "Tech industry, products and platforms"),
            feed("Science", "Science.xml", "Research, space and life sciences"),
            feed("Climate", "Climate.xml", "Climate and environment policy"),
            feed("Health", "Health.xml", "Health, medicine and public health"),
            feed("Sports", "Sports.xml", "US and world sports"),
            feed("Opinion", "Opinion.xml", "Editorials, columns and op-eds"),
            feed("Arts", "Arts.xml", "Arts, exhibitions and performances"),
            feed("ArtandDesign", "ArtandDesign.xml", "Visual art and design"),
            feed("Books", "Books.xml", "Book reviews and new releases"),
            feed("Movies", "Movies.xml", "Film news and reviews"),
            feed("Television", "Television.xml", "TV and streaming"),
            feed("Theater", "Theater.xml", "Theater and Broadway"),
            feed("Music", "Music.xml", "Pop and classical music"),
            feed("Style", "FashionandStyle.xml", "Style, fashion and trends"),
            feed("Food", "Food.xml", "Food, cooking and drink"),
            feed("Travel", "Travel.xml", "Travel and guides"),
            feed("RealEstate", "RealEstate.xml", "Real estate and housing"),
            feed("NYRegion", "NYRegion.xml", "New York region"),
            feed("Education", "Education.xml", "Education and universities"),
            feed("Obituaries", "Obituaries.xml", "Obituaries"),
            feed("Automobiles", "Automobiles.xml", "Cars and mobility"),
            feed("Space", "Space.xml", "Space and aerospace"),
            feed("PersonalTech", "PersonalTech.xml", "Personal devices and hardware"),
            feed("YourMoney", "YourMoney.xml", "Personal finance and consumers"),
            feed("MediaAds", "MediaandAdvertising.xml", "Media and advertising"),
            feed("SmallBusiness", "SmallBusiness.xml", "Small business"),
            feed("Weddings", "Weddings.xml", "Weddings and lifestyle"),
            feed("TMagazine", "TMagazine.xml", "T Magazine"),
        ],
        aliases: &[
            ("최신", "HomePage"),
            ("탑", "HomePage"),
            ("top stories", "HomePage"),
            ("세계", "World"),
            ("국제", "World"),
            ("미국", "US"),
            ("us", "US"),
            ("u.s.", "US"),
            ("정치", "Politics"),
            ("politics", "Politics"),
            ("백악관", "Politics"),
            ("의회", "Politics"),
            ("경제", "Economy"),
            ("거시", "Economy"),
            ("비즈니스", "Business"),
            ("기업", "Business"),
            ("마켓", "Business"),
            ("기술", "Technology"),
            ("테크", "Technology"),
            ("tech", "Technology"),
            ("과학", "Science"),
            ("science", "Science"),
            ("기후", "Climate"),
            ("환경", "Climate"),
            ("climate", "Climate"),
            ("건강", "Health"),
            ("health", "Health"),
            ("스포츠", "Sports"),
            ("sports", "Sports"),
            ("오피니언", "Opinion"),
            ("사설", "Opinion"),
            ("opinion", "Opinion"),
            ("예술", "Arts"),
            ("arts", "Arts"),
            ("책", "Books"),
            ("books", "Books"),
            ("영화", "Movies"),
            ("movie", "Movies"),
            ("무비", "Movies"),
            ("tv", "Television"),
            ("텔레비전", "Television"),
            ("드라마", "Television"),
            ("연극", "Theater"),
            ("theater", "Theater"),
            ("음악", "Music"),
            ("music", "Music"),
            ("스타일", "Style"),
            ("패션", "Style"),
            ("style", "Style"),
            ("음식", "Food"),
            ("요리", "Food"),
            ("food", "Food"),
            ("와인", "Food"),
            ("여행", "Travel"),
            ("travel", "Travel"),
            ("부동산", "RealEstate"),
            ("real estate", "RealEstate"),
            ("뉴욕", "NYRegion"),
            ("ny", "NYRegion"),
        ],
    },
    Publisher {
        id: "korea",
        brand: "The Korea Times",
        base_url: "https://feed.koreatimes.co.kr/k/",
        default_feed: "AllNews",
        names: &["kr", "한국", "대한민국", "코리아타임스"],
        feeds: &[
            feed("AllNews", "allnews.xml", "All articles"),
            feed("SouthKorea", "southkorea.xml", "Domestic politics and society"),
            feed("ForeignAffairs", "foreignaffairs.xml", "Diplomacy, security and North Korea"),
            feed("World", "world.xml", "World news"),
            feed("Economy", "economy.xml", "Macroeconomy and indicators"),
            feed("Business", "business.xml", "Industry, companies and finance"),
            feed("Lifestyle", "lifestyle.xml", "Lifestyle and trends"),
            feed("Entertainment", "entertainment.xml", "K-pop, film, TV and celebrities"),
            feed("Sports", "sports.xml", "Sports"),
            feed("Opinion", "opinion.xml", "Opinion and columns"),
            feed("Video", "video.xml", "Video"),
            feed("Photos", "photos.xml", "Photos"),
        ],
        aliases: &[
            ("전체", "AllNews"),
            ("all", "AllNews"),
            ("latest", "AllNews"),
            ("한국", "SouthKorea"),
            ("국내", "SouthKorea"),
            ("외교", "ForeignAffairs"),
            ("안보", "ForeignAffairs"),
            ("북핵", "ForeignAffairs"),
            ("세계", "World"),
            ("국제", "World"),
            ("경제", "Economy"),
            ("거시", "Economy"),
            ("비즈니스", "Business"),
            ("기업", "Business"),
            ("산업", "Business"),
            ("금융", "Business"),
            ("라이프", "Lifestyle"),
            ("트렌드", "Lifestyle"),
            ("생활", "Lifestyle"),
            ("연예", "Entertainment"),
            ("k팝", "Entertainment"),
            ("k-pop", "Entertainment"),
            ("엔터", "Entertainment"),
            ("스포츠", "Sports"),
            ("오피니언", "Opinion"),
            ("칼럼", "Opinion"),
            ("비디오", "Video"),
            ("동영상", "Video"),
            ("포토", "Photos"),
            ("사진", "Photos"),
        ],
    },
];
