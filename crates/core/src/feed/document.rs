//! Lossless Atom feed round-trip with in-place description overrides.
//!
//! The whole event stream is retained as parsed, so everything the
//! pipeline does not touch (namespaces, attribute order, whitespace,
//! elements it knows nothing about) is re-emitted byte for byte. Only
//! the text of an overridden `media:description` element is replaced.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::FeedError;

/// One video entry of the feed, as the pipeline sees it.
///
/// `link` is the entry's stable identity; `description` is the only
/// field the pipeline ever rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: String,
    pub author: String,
    pub title: String,
    pub description: String,
}

/// Which entry field a text run is currently being collected for.
enum CaptureField {
    Author,
    Title,
    Description,
}

struct CaptureState {
    field: CaptureField,
    buffer: String,
}

impl CaptureState {
    fn new(field: CaptureField) -> Self {
        Self {
            field,
            buffer: String::new(),
        }
    }

    fn element_name(&self) -> &'static str {
        match self.field {
            CaptureField::Author => "name",
            CaptureField::Title => "media:title",
            CaptureField::Description => "media:description",
        }
    }
}

/// Entry fields collected while walking one `<entry>` element.
#[derive(Default)]
struct EntryBuilder {
    link: Option<String>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    slot_start: Option<usize>,
    slot: Option<(usize, usize)>,
}

impl EntryBuilder {
    fn finish(self, index: usize) -> Result<(FeedEntry, (usize, usize)), FeedError> {
        let missing = |field| FeedError::MissingField { index, field };
        let entry = FeedEntry {
            link: self.link.ok_or_else(|| missing("link href"))?,
            author: self.author.ok_or_else(|| missing("author name"))?,
            title: self.title.ok_or_else(|| missing("media:title"))?,
            description: self.description.ok_or_else(|| missing("media:description"))?,
        };
        let slot = self.slot.ok_or_else(|| missing("media:description"))?;
        Ok((entry, slot))
    }
}

/// A parsed feed: the retained event stream plus the extracted entries.
#[derive(Debug)]
pub struct FeedDocument {
    events: Vec<Event<'static>>,
    entries: Vec<FeedEntry>,
    /// Per entry, the event indices of its description element's start
    /// and end tags; both indices are equal for a self-closing element.
    slots: Vec<(usize, usize)>,
    overrides: Vec<Option<String>>,
}

impl FeedDocument {
    /// Parses the feed, recognizing entries at `feed > entry`.
    ///
    /// An entry missing any of link/author/title/description is a
    /// [`FeedError::MissingField`]; elements outside that shape are kept
    /// verbatim but otherwise ignored.
    pub fn parse(xml: &str) -> Result<Self, FeedError> {
        let mut reader = Reader::from_str(xml);

        let mut events: Vec<Event<'static>> = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut entries: Vec<FeedEntry> = Vec::new();
        let mut slots: Vec<(usize, usize)> = Vec::new();
        let mut building: Option<EntryBuilder> = None;
        let mut capture: Option<CaptureState> = None;

        loop {
            let event = reader.read_event()?;
            let index = events.len();
            match &event {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(element_name(start));
                    if path_is(&stack, &["feed", "entry"]) {
                        building = Some(EntryBuilder::default());
                    } else if let Some(builder) = building.as_mut() {
                        if path_is(&stack, &["feed", "entry", "link"]) {
                            if builder.link.is_none() {
                                builder.link = href_attribute(start)?;
                            }
                        } else if path_is(&stack, &["feed", "entry", "author", "name"]) {
                            capture = Some(CaptureState::new(CaptureField::Author));
                        } else if path_is(&stack, &["feed", "entry", "media:group", "media:title"])
                        {
                            capture = Some(CaptureState::new(CaptureField::Title));
                        } else if path_is(
                            &stack,
                            &["feed", "entry", "media:group", "media:description"],
                        ) {
                            capture = Some(CaptureState::new(CaptureField::Description));
                            builder.slot_start = Some(index);
                        }
                    }
                }
                Event::Empty(start) => {
                    let name = element_name(start);
                    if let Some(builder) = building.as_mut() {
                        if child_path_is(&stack, &name, &["feed", "entry", "link"]) {
                            if builder.link.is_none() {
                                builder.link = href_attribute(start)?;
                            }
                        } else if child_path_is(
                            &stack,
                            &name,
                            &["feed", "entry", "media:group", "media:description"],
                        ) {
                            // A videoless description; still a valid slot
                            // for an override.
                            builder.description = Some(String::new());
                            builder.slot = Some((index, index));
                        }
                    }
                }
                Event::Text(text) => {
                    if let Some(state) = capture.as_mut() {
                        state.buffer.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(state) = capture.as_mut() {
                        state.buffer.push_str(&String::from_utf8_lossy(data));
                    }
                }
                Event::End(end) => {
                    let ended = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    let finished = capture
                        .as_ref()
                        .is_some_and(|state| state.element_name() == ended);
                    if finished {
                        if let (Some(state), Some(builder)) = (capture.take(), building.as_mut()) {
                            match state.field {
                                CaptureField::Author => builder.author = Some(state.buffer),
                                CaptureField::Title => builder.title = Some(state.buffer),
                                CaptureField::Description => {
                                    builder.description = Some(state.buffer);
                                    if let Some(start) = builder.slot_start.take() {
                                        builder.slot = Some((start, index));
                                    }
                                }
                            }
                        }
                    }
                    stack.pop();
                    if ended == "entry" && path_is(&stack, &["feed"]) {
                        if let Some(builder) = building.take() {
                            let (entry, slot) = builder.finish(entries.len())?;
                            entries.push(entry);
                            slots.push(slot);
                        }
                    }
                }
                _ => {}
            }
            events.push(event.into_owned());
        }

        let overrides = vec![None; entries.len()];
        Ok(Self {
            events,
            entries,
            slots,
            overrides,
        })
    }

    /// The extracted entries, in document order.
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    /// Replaces the description of the entry at `index`.
    ///
    /// The new text shows up in [`FeedDocument::entries`] immediately
    /// and in [`FeedDocument::to_xml`] output, escaped by the writer.
    pub fn set_description(&mut self, index: usize, text: String) {
        self.entries[index].description = text.clone();
        self.overrides[index] = Some(text);
    }

    /// Re-emits the feed, substituting overridden description text and
    /// reproducing everything else as parsed.
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut replacements: HashMap<usize, (usize, &str)> = HashMap::new();
        for (index, text) in self.overrides.iter().enumerate() {
            if let Some(text) = text {
                let (start, end) = self.slots[index];
                replacements.insert(start, (end, text.as_str()));
            }
        }

        let mut writer = Writer::new(Vec::new());
        let mut skip_until: Option<usize> = None;
        for (index, event) in self.events.iter().enumerate() {
            if let Some(end) = skip_until {
                if index < end {
                    continue;
                }
                skip_until = None;
            }
            match replacements.get(&index) {
                Some((end, text)) if *end == index => {
                    // A self-closing description grows a text child.
                    if let Event::Empty(element) = event {
                        write(&mut writer, Event::Start(element.clone()))?;
                        write(&mut writer, Event::Text(BytesText::new(text)))?;
                        write(&mut writer, Event::End(element.to_end().into_owned()))?;
                    } else {
                        write(&mut writer, event.clone())?;
                    }
                }
                Some((end, text)) => {
                    write(&mut writer, event.clone())?;
                    write(&mut writer, Event::Text(BytesText::new(text)))?;
                    skip_until = Some(*end);
                }
                None => write(&mut writer, event.clone())?,
            }
        }

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn path_is(stack: &[String], expected: &[&str]) -> bool {
    stack.len() == expected.len() && stack.iter().zip(expected).all(|(have, want)| have == want)
}

/// Like [`path_is`] for a childless element that was never pushed onto
/// the stack.
fn child_path_is(stack: &[String], name: &str, expected: &[&str]) -> bool {
    let Some((last, parents)) = expected.split_last() else {
        return false;
    };
    name == *last && path_is(stack, parents)
}

fn href_attribute(start: &BytesStart) -> Result<Option<String>, FeedError> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.as_ref() == b"href" {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|error| FeedError::Serialize {
            reason: error.to_string(),
        })
}
