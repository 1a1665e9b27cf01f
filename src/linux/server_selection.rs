use super::xorg_display::{SharedConnection, get_atom};
use crate::{Atom, TopMenuError, TopMenuResult};
use tracing::{info, warn};
use x11rb::{CURRENT_TIME, NONE, connection::Connection, protocol::xproto::ConnectionExt};

/// Ownership of the selection that tells menu clients which server is active.
#[derive(Debug)]
pub struct ServerSelection {
    conn: SharedConnection,
    owner: u32,
    selection: Atom,
    registered: bool,
}

impl ServerSelection {
    pub fn new(conn: SharedConnection, owner: u32, name: &str) -> TopMenuResult<Self> {
        let selection = get_atom(&*conn, name.as_bytes())?;
        Ok(Self {
            conn,
            owner,
            selection,
            registered: false,
        })
    }

    pub fn selection(&self) -> Atom {
        self.selection
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn register(&mut self) -> TopMenuResult<()> {
        self.conn
            .set_selection_owner(self.owner, self.selection, CURRENT_TIME)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;

        let owner = self.current_owner()?;
        if owner != self.owner {
            warn!("Could not acquire menu server selection; owner is {:#x}", owner);
            return Ok(());
        }

        info!("Registered as menu server");
        self.registered = true;
        Ok(())
    }

    pub fn unregister(&mut self) -> TopMenuResult<()> {
        if !self.registered {
            return Ok(());
        }
        self.registered = false;

        if self.current_owner()? == self.owner {
            self.conn
                .set_selection_owner(NONE, self.selection, CURRENT_TIME)
                .map_err(|e| TopMenuError::Platform(e.to_string()))?;
            self.conn
                .flush()
                .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        }

        info!("Unregistered as menu server");
        Ok(())
    }

    /// Another server took the selection over.
    pub fn lost(&mut self) {
        if self.registered {
            info!("Another menu server took over the selection");
        }
        self.registered = false;
    }

    fn current_owner(&self) -> TopMenuResult<u32> {
        let reply = self
            .conn
            .get_selection_owner(self.selection)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?
            .reply()
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        Ok(reply.owner)
    }
}
