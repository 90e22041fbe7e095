use super::header::*;
use super::name::*;
use super::question::*;
use super::resource::*;
use super::*;
use crate::error::{Error, Result};

// A Parser allows incrementally parsing a DNS message.
//
// When parsing is started, the Header is parsed. Next, each question can be
// either parsed or skipped. Alternatively, all questions (or answers,
// authorities and additionals) can be parsed in one call.
#[derive(Default)]
pub(crate) struct Parser<'a> {
    msg: &'a [u8],
    header: HeaderInternal,
    section: Section,
    off: usize,
    index: usize,
}

impl<'a> Parser<'a> {
    // start parses the header and enables the parsing of questions.
    pub(crate) fn start(&mut self, msg: &'a [u8]) -> Result<Header> {
        *self = Parser {
            msg,
            ..Default::default()
        };
        self.off = self.header.unpack(msg, 0)?;
        self.section = Section::Questions;
        Ok(self.header.header())
    }

    fn check_advance(&mut self, sec: Section) -> Result<()> {
        if self.section < sec {
            return Err(Error::ErrNotStarted);
        }
        if self.section > sec {
            return Err(Error::ErrSectionDone);
        }
        if self.index == self.header.count(sec) as usize {
            self.index = 0;
            self.next_section();
            return Err(Error::ErrSectionDone);
        }
        Ok(())
    }

    fn next_section(&mut self) {
        self.section = match self.section {
            Section::Questions => Section::Answers,
            Section::Answers => Section::Authorities,
            Section::Authorities => Section::Additionals,
            _ => Section::Done,
        };
    }

    // question parses a single question in the Questions section, returning
    // ErrSectionDone when the section is exhausted.
    pub(crate) fn question(&mut self) -> Result<Question> {
        self.check_advance(Section::Questions)?;

        let mut name = Name::default();
        let mut off = name.unpack(self.msg, self.off)?;

        let mut typ = DnsType::Unsupported;
        off = typ.unpack(self.msg, off)?;

        let mut class = DnsClass::default();
        off = class.unpack(self.msg, off)?;

        self.off = off;
        self.index += 1;
        Ok(Question { name, typ, class })
    }

    // all_questions parses all questions in the message.
    pub(crate) fn all_questions(&mut self) -> Result<Vec<Question>> {
        let mut qs = Vec::with_capacity(self.header.questions as usize);
        loop {
            match self.question() {
                Ok(q) => qs.push(q),
                Err(Error::ErrSectionDone) => return Ok(qs),
                Err(err) => return Err(err),
            }
        }
    }

    fn resource(&mut self, sec: Section) -> Result<Resource> {
        self.check_advance(sec)?;

        let mut header = ResourceHeader::default();
        let mut off = header.unpack(self.msg, self.off)?;

        let body_start = off;
        let (body, new_off) =
            unpack_resource_body(header.typ, self.msg, off, header.length as usize)?;
        off = new_off;

        // The resource body must consume exactly the advertised rdata length.
        if off != body_start + header.length as usize {
            return Err(Error::ErrResourceLen);
        }

        self.off = off;
        self.index += 1;
        Ok(Resource {
            header,
            body: Some(body),
        })
    }

    fn all_resources(&mut self, sec: Section) -> Result<Vec<Resource>> {
        let mut rs = Vec::with_capacity(self.header.count(sec) as usize);
        loop {
            match self.resource(sec) {
                Ok(r) => rs.push(r),
                Err(Error::ErrSectionDone) => return Ok(rs),
                Err(err) => return Err(err),
            }
        }
    }

    // all_answers parses all answer resources in the message.
    pub(crate) fn all_answers(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Answers)
    }

    // all_authorities parses all authority resources in the message.
    pub(crate) fn all_authorities(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Authorities)
    }

    // all_additionals parses all additional resources in the message.
    pub(crate) fn all_additionals(&mut self) -> Result<Vec<Resource>> {
        self.all_resources(Section::Additionals)
    }
}
