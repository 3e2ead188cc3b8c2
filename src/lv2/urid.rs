use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

use lv2_raw::core::LV2Feature;
use lv2_raw::urid::{LV2Urid, LV2UridMap, LV2UridMapHandle};
use parking_lot::Mutex;

/// `LV2_URID_Unmap_Handle` from `urid.h`; `lv2_raw` only binds the map side.
pub type LV2UridUnmapHandle = *mut c_void;

/// `LV2_URID_Unmap` from `urid.h`.
#[repr(C)]
pub struct LV2UridUnmap {
    pub handle: LV2UridUnmapHandle,
    pub unmap: extern "C" fn(handle: LV2UridUnmapHandle, urid: LV2Urid) -> *const c_char,
}

const URID_MAP_URI: &CStr = c"http://lv2plug.in/ns/ext/urid#map";
const URID_UNMAP_URI: &CStr = c"http://lv2plug.in/ns/ext/urid#unmap";
const BOUNDED_BLOCK_LENGTH_URI: &CStr = c"http://lv2plug.in/ns/ext/buf-size#boundedBlockLength";

/// Features the host can hand to a plugin.
pub const PROVIDED_FEATURES: &[&str] = &[
    "http://lv2plug.in/ns/ext/urid#map",
    "http://lv2plug.in/ns/ext/urid#unmap",
    "http://lv2plug.in/ns/ext/buf-size#boundedBlockLength",
];

pub struct UridMapper {
    inner: Mutex<UridMapperInner>,
}

struct UridMapperInner {
    uri_to_id: HashMap<String, LV2Urid>,
    /// Index 0 is reserved: URID 0 means "not mapped".  Entries are never
    /// removed, so pointers handed out by `unmap` stay valid.
    id_to_uri: Vec<CString>,
}

impl Default for UridMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl UridMapper {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(UridMapperInner {
                uri_to_id: HashMap::new(),
                id_to_uri: vec![CString::default()],
            }),
        }
    }

    pub fn map(&self, uri: &str) -> LV2Urid {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.uri_to_id.get(uri) {
            return id;
        }
        let Ok(c_uri) = CString::new(uri) else {
            return 0;
        };
        let id = inner.id_to_uri.len() as LV2Urid;
        inner.uri_to_id.insert(uri.to_string(), id);
        inner.id_to_uri.push(c_uri);
        id
    }

    pub fn unmap(&self, urid: LV2Urid) -> Option<String> {
        if urid == 0 {
            return None;
        }
        let inner = self.inner.lock();
        inner
            .id_to_uri
            .get(urid as usize)
            .map(|s| s.to_string_lossy().into_owned())
    }

    fn unmap_ptr(&self, urid: LV2Urid) -> *const c_char {
        if urid == 0 {
            return ptr::null();
        }
        let inner = self.inner.lock();
        inner
            .id_to_uri
            .get(urid as usize)
            .map_or(ptr::null(), |s| s.as_ptr())
    }

    pub fn as_lv2_urid_map(&self) -> LV2UridMap {
        LV2UridMap {
            handle: self as *const UridMapper as LV2UridMapHandle,
            map: urid_map_callback,
        }
    }

    pub fn as_lv2_urid_unmap(&self) -> LV2UridUnmap {
        LV2UridUnmap {
            handle: self as *const UridMapper as LV2UridUnmapHandle,
            unmap: urid_unmap_callback,
        }
    }

    /// # Safety
    /// `map_struct` must outlive every plugin instantiated with the feature.
    pub unsafe fn make_map_feature(map_struct: *mut LV2UridMap) -> LV2Feature {
        LV2Feature {
            uri: URID_MAP_URI.as_ptr(),
            data: map_struct as *mut c_void,
        }
    }

    /// # Safety
    /// `unmap_struct` must outlive every plugin instantiated with the feature.
    pub unsafe fn make_unmap_feature(unmap_struct: *mut LV2UridUnmap) -> LV2Feature {
        LV2Feature {
            uri: URID_UNMAP_URI.as_ptr(),
            data: unmap_struct as *mut c_void,
        }
    }
}

/// Promise that no run is longer than the host's chunk limit.
pub fn bounded_block_length_feature() -> LV2Feature {
    LV2Feature {
        uri: BOUNDED_BLOCK_LENGTH_URI.as_ptr(),
        data: ptr::null_mut(),
    }
}

extern "C" fn urid_map_callback(handle: LV2UridMapHandle, uri: *const c_char) -> LV2Urid {
    if handle.is_null() || uri.is_null() {
        return 0;
    }
    let mapper = unsafe { &*(handle as *const UridMapper) };
    let c_str = unsafe { CStr::from_ptr(uri) };
    match c_str.to_str() {
        Ok(s) => mapper.map(s),
        Err(_) => 0,
    }
}

extern "C" fn urid_unmap_callback(handle: LV2UridUnmapHandle, urid: LV2Urid) -> *const c_char {
    if handle.is_null() {
        return ptr::null();
    }
    let mapper = unsafe { &*(handle as *const UridMapper) };
    mapper.unmap_ptr(urid)
}
