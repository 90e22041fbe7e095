use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use super::*;
use crate::error::{Error, Result};

// A TxtResource is a TXT resource record: a sequence of character strings.
#[derive(Default, Debug, Clone)]
pub(crate) struct TxtResource {
    pub(crate) txt: Vec<String>,
}

impl fmt::Display for TxtResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxtResource{{TXT: {:?}}}", self.txt)
    }
}

impl ResourceBody for TxtResource {
    fn real_type(&self) -> DnsType {
        DnsType::Txt
    }

    fn pack(
        &self,
        mut msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        for s in &self.txt {
            msg = pack_str(msg, s)?;
        }
        Ok(msg)
    }

    fn unpack(&mut self, msg: &[u8], off: usize, length: usize) -> Result<usize> {
        let mut txts = vec![];
        let mut n = 0;
        let mut new_off = off;
        while n < length {
            let (t, o) = unpack_str(msg, new_off)?;
            // Check if we got too many bytes.
            if o - new_off > length - n {
                return Err(Error::ErrCalcLen);
            }
            n += o - new_off;
            new_off = o;
            txts.push(t);
        }
        self.txt = txts;
        Ok(new_off)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
